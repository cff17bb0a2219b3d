use cellgraph_graph::CellGraph;
use cellgraph_protocol::{
    Anomaly, AnomalyKind, AnomalyReport, CellRecord, Severity, SeverityCounts, SheetData,
};
use std::collections::BTreeMap;

/// Spreadsheet error markers that flag a broken reference wherever they
/// appear in a cell value.
pub const ERROR_MARKERS: [&str; 6] = ["#REF!", "#NAME!", "#VALUE!", "#DIV/0!", "#N/A", "#NUM!"];

/// Rows holding more than this many formulas are checked for
/// hard-coded overwrites.
const OVERWRITE_FORMULA_THRESHOLD: usize = 3;

/// Characters of formula text carried in unused-formula metadata.
const FORMULA_METADATA_MAX: usize = 100;

/// Runs the five detection passes over a finished graph and the raw
/// per-sheet records.
pub struct AnomalyDetector<'a> {
    graph: &'a CellGraph,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(graph: &'a CellGraph) -> Self {
        Self { graph }
    }

    /// Run every pass and return the concatenated findings.
    #[must_use]
    pub fn detect(&self, sheets: &[SheetData]) -> Vec<Anomaly> {
        log::info!("starting anomaly detection over {} sheets", sheets.len());

        let mut anomalies = Vec::new();
        self.detect_broken_references(sheets, &mut anomalies);
        self.detect_unused_formulas(&mut anomalies);
        self.detect_circular_references(&mut anomalies);
        self.detect_hard_coded_overwrites(sheets, &mut anomalies);
        self.detect_missing_dependencies(&mut anomalies);

        log::info!("anomaly detection complete: {} findings", anomalies.len());
        anomalies
    }

    /// Cells whose value contains a spreadsheet error marker.
    fn detect_broken_references(&self, sheets: &[SheetData], anomalies: &mut Vec<Anomaly>) {
        for sheet in sheets {
            for cell in &sheet.cells {
                let Some(value) = cell.value.as_deref() else {
                    continue;
                };
                if ERROR_MARKERS.iter().any(|marker| value.contains(marker)) {
                    anomalies.push(Anomaly {
                        kind: AnomalyKind::BrokenReference,
                        severity: Severity::High,
                        cell_address: address(&sheet.name, cell),
                        sheet: sheet.name.clone(),
                        description: format!("Cell contains error value: {value}"),
                        suggestion: Some(
                            "Check formula references and ensure all referenced cells exist"
                                .to_string(),
                        ),
                        metadata: BTreeMap::from([(
                            "error_value".to_string(),
                            serde_json::Value::String(value.to_string()),
                        )]),
                    });
                }
            }
        }
    }

    /// Formula cells no other cell depends on (dead logic).
    fn detect_unused_formulas(&self, anomalies: &mut Vec<Anomaly>) {
        for (id, node) in self.graph.nodes() {
            if !node.has_formula || self.graph.out_degree(id) > 0 {
                continue;
            }
            let formula: String = node
                .formula
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(FORMULA_METADATA_MAX)
                .collect();
            anomalies.push(Anomaly {
                kind: AnomalyKind::UnusedFormula,
                severity: Severity::Low,
                cell_address: node.address.clone(),
                sheet: node.sheet.clone(),
                description: "Formula is not used by any other cell".to_string(),
                suggestion: Some(
                    "Consider removing this formula if it's not needed for output".to_string(),
                ),
                metadata: BTreeMap::from([(
                    "formula".to_string(),
                    serde_json::Value::String(formula),
                )]),
            });
        }
    }

    /// One finding per node per cycle, each carrying the full path.
    fn detect_circular_references(&self, anomalies: &mut Vec<Anomaly>) {
        for cycle in self.graph.detect_cycles() {
            let mut path = cycle.join(" → ");
            if let Some(first) = cycle.first() {
                path.push_str(" → ");
                path.push_str(first);
            }
            for address in &cycle {
                let sheet = self
                    .graph
                    .find_node(address)
                    .and_then(|id| self.graph.node(id))
                    .map(|n| n.sheet.clone())
                    .unwrap_or_default();
                anomalies.push(Anomaly {
                    kind: AnomalyKind::CircularReference,
                    severity: Severity::Critical,
                    cell_address: address.clone(),
                    sheet,
                    description: format!("Part of circular reference: {path}"),
                    suggestion: Some(
                        "Break the circular dependency by restructuring formulas".to_string(),
                    ),
                    metadata: BTreeMap::from([(
                        "cycle".to_string(),
                        serde_json::Value::Array(
                            cycle
                                .iter()
                                .map(|a| serde_json::Value::String(a.clone()))
                                .collect(),
                        ),
                    )]),
                });
            }
        }
    }

    /// Non-formula values sitting in rows dominated by formulas.
    ///
    /// A heuristic, not a proof: rows with more than
    /// `OVERWRITE_FORMULA_THRESHOLD` formulas flag every sibling cell
    /// holding a plain value. False positives are expected.
    fn detect_hard_coded_overwrites(&self, sheets: &[SheetData], anomalies: &mut Vec<Anomaly>) {
        for sheet in sheets {
            let mut rows: BTreeMap<u32, Vec<&CellRecord>> = BTreeMap::new();
            for cell in &sheet.cells {
                rows.entry(cell.row).or_default().push(cell);
            }

            for row_cells in rows.values() {
                let formula_count = row_cells.iter().filter(|c| c.has_formula()).count();
                let value_count = row_cells
                    .iter()
                    .filter(|c| !c.has_formula() && c.has_value())
                    .count();
                if formula_count <= OVERWRITE_FORMULA_THRESHOLD || value_count == 0 {
                    continue;
                }
                for cell in row_cells {
                    if cell.has_formula() || !cell.has_value() {
                        continue;
                    }
                    anomalies.push(Anomaly {
                        kind: AnomalyKind::HardCodedOverwrite,
                        severity: Severity::Medium,
                        cell_address: address(&sheet.name, cell),
                        sheet: sheet.name.clone(),
                        description: "Cell contains hard-coded value in a row of formulas"
                            .to_string(),
                        suggestion: Some(
                            "Verify if this should be a formula instead of a hard-coded value"
                                .to_string(),
                        ),
                        metadata: BTreeMap::from([
                            (
                                "value".to_string(),
                                serde_json::Value::String(
                                    cell.value.clone().unwrap_or_default(),
                                ),
                            ),
                            (
                                "row_formula_count".to_string(),
                                serde_json::Value::from(formula_count),
                            ),
                        ]),
                    });
                }
            }
        }
    }

    /// Predecessor ids that resolve to no node.
    ///
    /// Placeholder synthesis during construction makes this structurally
    /// unreachable; the pass stays as an independently verifiable
    /// invariant check.
    fn detect_missing_dependencies(&self, anomalies: &mut Vec<Anomaly>) {
        for (id, node) in self.graph.nodes() {
            for &pred in self.graph.predecessors(id) {
                if self.graph.node(pred).is_some() {
                    continue;
                }
                anomalies.push(Anomaly {
                    kind: AnomalyKind::MissingDependency,
                    severity: Severity::High,
                    cell_address: node.address.clone(),
                    sheet: node.sheet.clone(),
                    description: format!(
                        "References non-existent cell at node index {}",
                        pred.index()
                    ),
                    suggestion: Some(
                        "Check if the referenced cell was deleted or moved".to_string(),
                    ),
                    metadata: BTreeMap::from([(
                        "missing_node_index".to_string(),
                        serde_json::Value::from(pred.index()),
                    )]),
                });
            }
        }
    }

    /// Summarize findings into the flat report format.
    #[must_use]
    pub fn export(&self, anomalies: &[Anomaly]) -> AnomalyReport {
        let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_severity = SeverityCounts::default();
        for anomaly in anomalies {
            *by_kind.entry(anomaly.kind.as_str().to_string()).or_default() += 1;
            match anomaly.severity {
                Severity::Critical => by_severity.critical += 1,
                Severity::High => by_severity.high += 1,
                Severity::Medium => by_severity.medium += 1,
                Severity::Low => by_severity.low += 1,
            }
        }
        AnomalyReport {
            total_count: anomalies.len(),
            by_kind,
            by_severity,
            anomalies: anomalies.to_vec(),
        }
    }
}

/// Anomalies filtered to one severity.
#[must_use]
pub fn by_severity(anomalies: &[Anomaly], severity: Severity) -> Vec<&Anomaly> {
    anomalies.iter().filter(|a| a.severity == severity).collect()
}

/// Anomalies filtered to one sheet.
#[must_use]
pub fn by_sheet<'a>(anomalies: &'a [Anomaly], sheet: &str) -> Vec<&'a Anomaly> {
    anomalies.iter().filter(|a| a.sheet == sheet).collect()
}

fn address(sheet: &str, cell: &CellRecord) -> String {
    format!("{}!{}{}", sheet, cell.column.to_ascii_uppercase(), cell.row)
}
