//! # PCRE ingester entry point
//!
//! `import` runs a batch of `(path, group)` jobs and prints the JSON import
//! report on stdout. `inspect` lists the groups and channel blocks of one file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use pcre_ingest::{
    config::{AppConfig, ConfigLoader},
    db,
    error::IngestError,
    ingest::{DiscardSink, FileErrorPolicy, ImportJob, ImportReport, Importer, navigator},
    repositories::{CapacitorRepository, TransientReadingRepository},
    source::{FileSourceOpener, SourceOpener},
    telemetry,
};

#[derive(Parser, Debug)]
#[command(
    name = "pcre-ingest",
    version,
    about = "Import transient capacitor recordings into prognostics.transient_readings"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import channel data from one or more files
    Import(ImportArgs),
    /// List the groups and channel blocks in a file
    Inspect {
        /// Source file (`.mat` / HDF5, or a `.json` tree)
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Job as GROUP=PATH, e.g. ES12=data/ES12_v2.mat (repeatable, processed in order)
    #[arg(long = "job", value_name = "GROUP=PATH")]
    jobs: Vec<ImportJob>,

    /// JSON manifest: [{"path": "...", "group": "..."}]
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Resolve and align everything but discard the rows instead of writing them
    #[arg(long)]
    dry_run: bool,

    /// Rows per insert statement (overrides PCRE_BATCH_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,

    /// continue | abort (overrides PCRE_ON_FILE_ERROR)
    #[arg(long, value_name = "POLICY")]
    on_file_error: Option<FileErrorPolicy>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = ConfigLoader::new()
        .read()
        .context("loading configuration")?;

    match cli.command {
        Command::Inspect { path } => {
            config.validate().context("validating configuration")?;
            telemetry::init_tracing(&config)?;
            inspect(&path)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Import(args) => {
            let config = config.with_overrides(args.batch_size, args.on_file_error);
            config.validate().context("validating configuration")?;
            telemetry::init_tracing(&config)?;

            let jobs = collect_jobs(&args)?;
            match import(&config, &jobs, args.dry_run).await? {
                Ok(report) => {
                    println!("{}", report.to_json_pretty()?);
                    if report.files_failed() > 0 {
                        Ok(ExitCode::FAILURE)
                    } else {
                        Ok(ExitCode::SUCCESS)
                    }
                }
                Err(err) => {
                    // Rows committed before the abort are still reported.
                    if let Some(report) = err.partial_report() {
                        println!("{}", report.to_json_pretty()?);
                    }
                    eprintln!("error: {err}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn collect_jobs(args: &ImportArgs) -> Result<Vec<ImportJob>> {
    let mut jobs = Vec::new();

    if let Some(manifest) = &args.manifest {
        let raw = std::fs::read_to_string(manifest)
            .with_context(|| format!("reading manifest {}", manifest.display()))?;
        let listed: Vec<ImportJob> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing manifest {}", manifest.display()))?;
        jobs.extend(listed);
    }
    jobs.extend(args.jobs.iter().cloned());

    if jobs.is_empty() {
        bail!("no import jobs given; pass --job GROUP=PATH or --manifest FILE");
    }
    Ok(jobs)
}

/// Sets up the store and runs the batch. The outer error covers setup; the
/// inner result is the run itself.
async fn import(
    config: &AppConfig,
    jobs: &[ImportJob],
    dry_run: bool,
) -> Result<Result<ImportReport, IngestError>> {
    info!(profile = %config.profile, jobs = jobs.len(), dry_run, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let db = Arc::new(
        db::init_pool(config)
            .await
            .context("initializing database connection pool")?,
    );
    db::verify_catalog(&db).await?;

    let catalog = CapacitorRepository::new(db.clone());
    let opener = FileSourceOpener;

    let outcome = if dry_run {
        let sink = DiscardSink::new();
        let outcome = Importer::new(&opener, &catalog, &sink, config.import_options())
            .run_batch_import(jobs)
            .await;
        info!(rows = sink.rows(), batches = sink.batches(), "Dry run discarded rows");
        outcome
    } else {
        let sink = TransientReadingRepository::new(db.clone());
        Importer::new(&opener, &catalog, &sink, config.import_options())
            .run_batch_import(jobs)
            .await
    };

    if let Ok(report) = &outcome {
        info!(rows_written = report.rows_written(), "All imports complete");
    }
    Ok(outcome)
}

fn inspect(path: &Path) -> Result<()> {
    let source = FileSourceOpener
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let groups = navigator::list_groups(source.as_ref())
        .with_context(|| format!("listing groups in {}", path.display()))?;

    println!("{}", path.display());
    for (group, channels) in groups {
        if channels.is_empty() {
            println!("  {group} (no transient data)");
        } else {
            println!("  {group}: {}", channels.join(", "));
        }
    }
    Ok(())
}
