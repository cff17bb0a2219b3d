use crate::error::{Result, ServiceError};
use cellgraph_analytics::CostDriverAnalyzer;
use cellgraph_anomaly::AnomalyDetector;
use cellgraph_graph::GraphBuilder;
use cellgraph_protocol::{AnalysisReport, AnalysisSummary, SheetData};
use std::collections::HashSet;

/// Switches and limits for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Carry cell display values onto graph nodes and into the export
    pub include_values: bool,
    /// Run the anomaly passes
    pub detect_anomalies: bool,
    /// Run the cost-driver analysis
    pub identify_cost_drivers: bool,
    /// Ranked drivers returned in the report
    pub top_drivers_count: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_values: false,
            detect_anomalies: true,
            identify_cost_drivers: true,
            top_drivers_count: 50,
        }
    }
}

/// Run the full pipeline over already-materialized sheet records.
///
/// `progress` is invoked at coarse milestones with a percentage and a
/// short message. The two downstream stages both read the same finished
/// graph; neither mutates it.
pub fn analyze_sheets(
    sheets: &[SheetData],
    options: &AnalysisOptions,
    mut progress: impl FnMut(u8, &str),
) -> Result<AnalysisReport> {
    if sheets.is_empty() {
        return Err(ServiceError::EmptyWorkbook);
    }

    log::info!("starting workbook analysis over {} sheets", sheets.len());

    progress(35, "Building dependency graph");
    let graph = GraphBuilder::new().build(sheets, options.include_values);
    progress(60, "Dependency graph complete");

    let anomalies = if options.detect_anomalies {
        progress(65, "Detecting anomalies");
        let detector = AnomalyDetector::new(&graph);
        let findings = detector.detect(sheets);
        progress(75, &format!("Found {} anomalies", findings.len()));
        Some(detector.export(&findings))
    } else {
        None
    };

    let cost_drivers = if options.identify_cost_drivers {
        progress(80, "Identifying cost drivers");
        let mut analyzer = CostDriverAnalyzer::new(&graph);
        let drivers = analyzer.analyze(options.top_drivers_count);
        progress(90, &format!("Identified {} cost drivers", drivers.len()));
        Some(analyzer.export(options.top_drivers_count))
    } else {
        None
    };

    progress(95, "Preparing results");
    let graph_export = graph.export();
    let summary = summarize(&graph_export);
    let report = AnalysisReport {
        graph: graph_export,
        anomalies,
        cost_drivers,
        summary,
    };
    progress(100, "Analysis complete");

    log::info!("workbook analysis complete");
    Ok(report)
}

fn summarize(graph: &cellgraph_protocol::GraphExport) -> AnalysisSummary {
    let sheets: HashSet<&str> = graph.nodes.iter().map(|n| n.sheet.as_str()).collect();
    AnalysisSummary {
        formula_count: graph.nodes.iter().filter(|n| n.has_formula).count(),
        input_count: graph.nodes.iter().filter(|n| n.is_input).count(),
        sheet_count: sheets.len(),
    }
}
