use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use yearload::{
    DatasetType, IngestConfig, IngestionRun, LogProgress, MetricsCollector, RunParams,
    SourceFile, SqliteSink, YearSet, reconcile,
};

#[derive(Parser, Debug)]
#[command(name = "yearload", about = "Load collision exports into per-year tables")]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, global = true, env = "YEARLOAD_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "YEARLOAD_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recreate the requested year tables and load the source into them
    Ingest(IngestArgs),
    /// Print row counts per year and dataset
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Dataset code: C, V or P (a trailing "reload" is accepted)
    #[arg(long, value_parser = parse_dataset)]
    dataset: DatasetType,

    /// Years to load, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    years: Vec<i32>,

    /// Source CSV file (.gz / .zst are decoded)
    #[arg(long)]
    source: PathBuf,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Time column format
    #[arg(long)]
    time_format: Option<String>,

    /// Write run metrics as JSON
    #[arg(long)]
    metrics_out: Option<PathBuf>,

    /// Write malformed-row samples as JSON
    #[arg(long)]
    rejects_out: Option<PathBuf>,

    /// Print run metrics to stdout when done
    #[arg(long)]
    show_metrics: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// First year of the report
    #[arg(long)]
    from: Option<i32>,

    /// Last year of the report
    #[arg(long)]
    to: Option<i32>,
}

/// `"C"`, `"v"`, `"persons"`, `"C reload"`.
fn parse_dataset(s: &str) -> Result<DatasetType, String> {
    let trimmed = s.trim();
    let code = match trimmed.rsplit_once(char::is_whitespace) {
        Some((code, suffix)) if suffix.eq_ignore_ascii_case("reload") => code.trim(),
        _ => trimmed,
    };
    code.parse::<DatasetType>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };
    if let Some(db) = cli.db {
        config.database = db;
    }

    match cli.command {
        Command::Ingest(args) => ingest(args, config),
        Command::Check(args) => check(args, config),
    }
}

fn ingest(args: IngestArgs, mut config: IngestConfig) -> Result<()> {
    if let Some(n) = args.batch_size {
        config.batch_size = n;
    }
    if let Some(fmt) = args.time_format {
        config.time_format = fmt;
    }

    let sink = SqliteSink::open(&config.database)
        .with_context(|| format!("open database {}", config.database.display()))?;
    let years = YearSet::new(args.years)?;
    let params = RunParams::from_config(args.dataset, years, &config);
    let source = SourceFile::new(&args.source);
    info!(
        dataset = %params.dataset,
        years = %params.years,
        source = %source.path().display(),
        database = %config.database.display(),
        "Starting ingestion"
    );

    let metrics = MetricsCollector::new();
    metrics.record_start();
    let mut run = IngestionRun::new(params);
    let outcome = run.execute_file(&source, &sink, &mut LogProgress);
    metrics.record_end();

    if let Some(path) = &args.rejects_out {
        run.rejects()
            .write_to_file(path)
            .with_context(|| format!("write rejects {}", path.display()))?;
    }

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            error!(state = %run.state(), "Ingestion failed");
            return Err(e.into());
        }
    };
    summary.record_into(&metrics);
    if let Some(path) = &args.metrics_out {
        metrics.save_to_file(path)?;
    }
    if args.show_metrics {
        metrics.print();
    }
    info!(rows = summary.total_rows, "Finished ingesting data into the database.");
    Ok(())
}

fn check(args: CheckArgs, mut config: IngestConfig) -> Result<()> {
    if let Some(from) = args.from {
        config.report_from = from;
    }
    if let Some(to) = args.to {
        config.report_to = to;
    }
    if config.report_from > config.report_to {
        bail!("--from {} is after --to {}", config.report_from, config.report_to);
    }
    let sink = SqliteSink::open(&config.database)
        .with_context(|| format!("open database {}", config.database.display()))?;
    let report = reconcile(config.report_years(), &DatasetType::ALL, &sink)?;
    println!("\n{report}");
    Ok(())
}
