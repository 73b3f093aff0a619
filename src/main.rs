//! Command line front end for the airgrid pipeline.
//!
//! ```bash
//! # clean every raw archive under ./data, then merge
//! airgrid --root data run
//!
//! # clean only PurpleAir
//! airgrid clean --source purpleair
//!
//! # fold a fetched batch into the AQS raw archive
//! airgrid append --source aqs batch.csv
//!
//! # what should the next Open-Meteo request cover?
//! airgrid --json window --source openmeteo
//! ```
//!
//! Logging is controlled with `RUST_LOG` and defaults to `info`.

use airgrid::{
    coverage, read_csv_if_exists, CleanReport, CleanStatus, ColumnCoverage, Pipeline, Source,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;
use polars::prelude::DataFrame;
use std::path::PathBuf;

/// Normalize and merge air-quality sources onto one hourly UTC table.
#[derive(Parser)]
#[command(name = "airgrid", version)]
struct Cli {
    /// Data root holding `raw/`, `interim/` and `processed/`. Defaults to
    /// the per-user data folder.
    #[arg(long, env = "AIRGRID_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Print reports as JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize raw archives into interim tables.
    Clean {
        /// Only clean this source.
        #[arg(long)]
        source: Option<Source>,
    },
    /// Merge the interim tables onto the hourly grid.
    Merge,
    /// Clean every source, then merge.
    Run,
    /// Append a fetched CSV batch to a source's raw archive.
    Append {
        #[arg(long)]
        source: Source,
        /// CSV file with a header row.
        batch: PathBuf,
    },
    /// Show the time range the next fetch for a source should request.
    Window {
        #[arg(long)]
        source: Source,
        /// Split long windows into the source's request chunks.
        #[arg(long, default_value_t = false)]
        chunked: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let pipeline = match &cli.root {
        Some(root) => Pipeline::with_data_folder(root.clone()),
        None => Pipeline::new(),
    }
    .context("failed to open data folder")?;
    info!("Using data root {}", pipeline.paths().root().display());

    match cli.command {
        Command::Clean { source: Some(source) } => {
            match pipeline.clean_source(source)? {
                Some(df) => println!("{}: {} rows x {} columns", source, df.height(), df.width()),
                None => bail!(
                    "{}: no raw archive at {}",
                    source,
                    pipeline.paths().raw_file(source).display()
                ),
            }
        }
        Command::Clean { source: None } => {
            let report = pipeline.clean_all();
            print_clean_report(&report, cli.json)?;
            fail_on_clean_errors(&report)?;
        }
        Command::Merge => {
            let merged = pipeline.merge_all()?;
            print_merge(&pipeline, &merged, cli.json)?;
        }
        Command::Run => {
            let (report, merged) = pipeline.run()?;
            print_clean_report(&report, cli.json)?;
            print_merge(&pipeline, &merged, cli.json)?;
            fail_on_clean_errors(&report)?;
        }
        Command::Append { source, batch } => {
            let frame = read_csv_if_exists(&batch)?
                .with_context(|| format!("batch file {} not found", batch.display()))?;
            let summary = pipeline.append().source(source).batch(frame).call()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{}: {} existing + {} fetched -> {} added, {} total",
                    source,
                    summary.existing_rows,
                    summary.batch_rows,
                    summary.added_rows,
                    summary.total_rows
                );
            }
        }
        Command::Window { source, chunked } => {
            let window = pipeline.fetch_window().source(source).call()?;
            let windows = match (window, source.refresh_policy().chunk_days()) {
                (Some(w), Some(days)) if chunked => w.chunks(days),
                (Some(w), _) => vec![w],
                (None, _) => Vec::new(),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&windows)?);
            } else if windows.is_empty() {
                println!("{}: nothing to fetch", source);
            } else {
                for w in windows {
                    println!("{}: {} .. {}", source, w.start, w.end);
                }
            }
        }
    }
    Ok(())
}

fn print_clean_report(report: &CleanReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for outcome in &report.outcomes {
        let status = match &outcome.status {
            CleanStatus::Cleaned { rows, columns } => format!("{} rows x {} columns", rows, columns),
            CleanStatus::MissingRaw => "no raw archive".to_string(),
            CleanStatus::Failed { error } => format!("FAILED: {}", error),
        };
        println!("{:<10} {}", outcome.source.slug(), status);
    }
    Ok(())
}

fn print_merge(pipeline: &Pipeline, merged: &DataFrame, json: bool) -> anyhow::Result<()> {
    let report: Vec<ColumnCoverage> = coverage(merged);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!(
        "Merged {} hours x {} columns into {}",
        merged.height(),
        merged.width(),
        pipeline.paths().merged_file().display()
    );
    for entry in report {
        println!("{:<28} {:>6.1}%", entry.column, entry.fraction * 100.0);
    }
    Ok(())
}

fn fail_on_clean_errors(report: &CleanReport) -> anyhow::Result<()> {
    if report.has_failures() {
        let failed: Vec<&str> = report.failures().map(|o| o.source.slug()).collect();
        bail!("cleaning failed for: {}", failed.join(", "));
    }
    Ok(())
}
