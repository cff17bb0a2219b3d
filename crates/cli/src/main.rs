use anyhow::Context;
use cellgraph_server::ServerConfig;
use cellgraph_service::{analyze_sheets, AnalysisOptions};
use cellgraph_workbook::read_workbook;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cellgraph")]
#[command(about = "Spreadsheet dependency graph analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a workbook and print the report as JSON
    Analyze(AnalyzeArgs),

    /// Serve the analysis API over HTTP
    Serve(ServeArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Path to the workbook (.xlsx / .xlsm)
    file: PathBuf,

    /// Carry cell values into the exported graph
    #[arg(long)]
    include_values: bool,

    /// Skip the anomaly detection passes
    #[arg(long)]
    no_anomalies: bool,

    /// Skip the cost-driver analysis
    #[arg(long)]
    no_drivers: bool,

    /// Number of top cost drivers to report
    #[arg(long, default_value_t = 50)]
    top: usize,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Listen address (overrides CELLGRAPH_BIND)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for JSON output; logs go to stderr.
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Serve(args) => run_serve(args).await,
    }
}

fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<()> {
    let sheets = read_workbook(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    log::info!("read {} sheets from {}", sheets.len(), args.file.display());

    let options = AnalysisOptions {
        include_values: args.include_values,
        detect_anomalies: !args.no_anomalies,
        identify_cost_drivers: !args.no_drivers,
        top_drivers_count: args.top,
    };

    let report = analyze_sheets(&sheets, &options, |percent, message| {
        log::info!("[{percent:>3}%] {message}");
    })?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    cellgraph_server::serve(config).await
}
