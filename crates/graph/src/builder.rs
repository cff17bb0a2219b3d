use crate::types::{CellGraph, CellNode, EdgeKind, NodeId, FORMULA_EXCERPT_MAX};
use cellgraph_extract::{extract, CellAddress};
use cellgraph_protocol::{CellRecord, SheetData};

/// Builds a [`CellGraph`] from per-sheet cell records.
///
/// Construction is two-pass by design: every explicit cell record
/// becomes a node before any formula is walked, so node attributes
/// reflect the authoritative record rather than a placeholder that a
/// formula happened to reference first.
#[derive(Debug, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the dependency graph.
    ///
    /// `include_values` controls whether cell display values are carried
    /// onto the nodes. Addresses referenced by a formula but absent from
    /// `sheets` are synthesized as placeholder nodes so every edge has
    /// valid endpoints.
    pub fn build(&self, sheets: &[SheetData], include_values: bool) -> CellGraph {
        log::info!("starting graph construction over {} sheets", sheets.len());

        let mut graph = CellGraph::new();

        // Pass 1: nodes for all explicit cell records.
        for sheet in sheets {
            for cell in &sheet.cells {
                graph.insert_node(record_node(&sheet.name, cell, include_values));
            }
        }

        // Pass 2: walk every formula, synthesize missing dependency
        // nodes, insert edges dependency → dependent.
        for sheet in sheets {
            for cell in sheet.formula_cells() {
                let formula = cell.formula.as_deref().unwrap_or_default();
                // Pass 1 inserted a node for every explicit record.
                let Some(target) = graph.find_node(&canonical(&sheet.name, &cell.column, cell.row))
                else {
                    continue;
                };
                self.link_formula(&mut graph, &sheet.name, target, formula);
            }
        }

        graph.recompute_io_flags();

        let acyclic = graph.calculation_order().len() == graph.node_count();
        if !acyclic {
            log::warn!("circular references detected during construction");
        }
        log::info!(
            "graph construction complete: {} nodes, {} edges, acyclic={}",
            graph.node_count(),
            graph.edge_count(),
            acyclic
        );

        graph
    }

    fn link_formula(&self, graph: &mut CellGraph, sheet: &str, target: NodeId, formula: &str) {
        let refs = extract(formula, Some(sheet));
        let kind = if refs.is_dynamic {
            EdgeKind::Dynamic
        } else {
            EdgeKind::Static
        };
        let excerpt: String = formula.chars().take(FORMULA_EXCERPT_MAX).collect();

        // Deterministic edge order: the extractor returns a set.
        let mut dependencies: Vec<CellAddress> = refs.dependencies.into_iter().collect();
        dependencies.sort_by_key(CellAddress::canonical);

        for dep in dependencies {
            let address = dep.canonical();
            let source = match graph.find_node(&address) {
                Some(id) => id,
                None => graph.insert_node(placeholder_node(
                    dep.sheet.as_deref().unwrap_or(sheet),
                    &dep.column,
                    dep.row,
                )),
            };
            graph.insert_edge(source, target, kind, Some(excerpt.clone()));
        }
    }
}

fn canonical(sheet: &str, column: &str, row: u32) -> String {
    CellAddress::new(Some(sheet), column, row).canonical()
}

fn record_node(sheet: &str, cell: &CellRecord, include_values: bool) -> CellNode {
    let column = cell.column.to_ascii_uppercase();
    CellNode {
        address: canonical(sheet, &column, cell.row),
        sheet: sheet.to_string(),
        column,
        row: cell.row,
        value: if include_values {
            cell.value.clone()
        } else {
            None
        },
        formula: cell.formula.clone(),
        has_formula: cell.has_formula(),
        is_input: false,
        is_output: false,
    }
}

fn placeholder_node(sheet: &str, column: &str, row: u32) -> CellNode {
    CellNode {
        address: canonical(sheet, column, row),
        sheet: sheet.to_string(),
        column: column.to_string(),
        row,
        value: None,
        formula: None,
        has_formula: false,
        is_input: false,
        is_output: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value_cell(column: &str, row: u32, value: &str) -> CellRecord {
        CellRecord {
            row,
            column: column.to_string(),
            value: Some(value.to_string()),
            formula: None,
            data_type: "float".to_string(),
        }
    }

    fn formula_cell(column: &str, row: u32, formula: &str) -> CellRecord {
        CellRecord {
            row,
            column: column.to_string(),
            value: None,
            formula: Some(formula.to_string()),
            data_type: "float".to_string(),
        }
    }

    fn sheet(name: &str, cells: Vec<CellRecord>) -> SheetData {
        SheetData {
            name: name.to_string(),
            cells,
            row_count: 0,
            col_count: 0,
        }
    }

    #[test]
    fn test_build_simple_graph() {
        let sheets = vec![sheet(
            "Sheet1",
            vec![
                value_cell("A", 1, "5"),
                value_cell("B", 1, "5"),
                formula_cell("C", 1, "=A1+B1"),
            ],
        )];

        let graph = GraphBuilder::new().build(&sheets, false);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);

        let a1 = graph.find_node("Sheet1!A1").unwrap();
        let b1 = graph.find_node("Sheet1!B1").unwrap();
        let c1 = graph.find_node("Sheet1!C1").unwrap();

        assert!(graph.node(a1).unwrap().is_input);
        assert!(graph.node(b1).unwrap().is_input);
        assert!(graph.node(c1).unwrap().is_output);
        assert!(!graph.node(c1).unwrap().is_input);
        assert!(graph.node(c1).unwrap().has_formula);
    }

    #[test]
    fn test_placeholder_synthesized_for_external_reference() {
        let sheets = vec![sheet("Sheet1", vec![formula_cell("A", 1, "=Other!Z9*2")])];

        let graph = GraphBuilder::new().build(&sheets, false);

        let placeholder = graph.find_node("Other!Z9").unwrap();
        let node = graph.node(placeholder).unwrap();
        assert!(!node.has_formula);
        assert_eq!(node.sheet, "Other");
        assert!(node.is_input);
    }

    #[test]
    fn test_duplicate_references_collapse_to_one_edge() {
        let sheets = vec![sheet(
            "Sheet1",
            vec![value_cell("A", 1, "1"), formula_cell("B", 1, "=A1+A1*A1")],
        )];

        let graph = GraphBuilder::new().build(&sheets, false);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_dynamic_formula_marks_edges() {
        let sheets = vec![sheet(
            "Sheet1",
            vec![value_cell("A", 1, "1"), formula_cell("B", 1, "=OFFSET(A1,1,0)")],
        )];

        let graph = GraphBuilder::new().build(&sheets, false);
        assert!(graph
            .edges()
            .iter()
            .all(|e| e.kind == EdgeKind::Dynamic));
    }

    #[test]
    fn test_values_kept_only_on_opt_in() {
        let cells = vec![value_cell("A", 1, "42")];
        let with_values = GraphBuilder::new().build(&[sheet("S", cells.clone())], true);
        let without = GraphBuilder::new().build(&[sheet("S", cells)], false);

        let id = with_values.find_node("S!A1").unwrap();
        assert_eq!(with_values.node(id).unwrap().value.as_deref(), Some("42"));
        let id = without.find_node("S!A1").unwrap();
        assert_eq!(without.node(id).unwrap().value, None);
    }

    #[test]
    fn test_formula_excerpt_is_bounded() {
        let long_formula = format!("=A1+{}", "B2+".repeat(40));
        let sheets = vec![sheet("S", vec![formula_cell("C", 1, &long_formula)])];

        let graph = GraphBuilder::new().build(&sheets, false);
        for edge in graph.edges() {
            let excerpt = edge.formula_excerpt.as_ref().unwrap();
            assert!(excerpt.chars().count() <= FORMULA_EXCERPT_MAX);
        }
    }
}
