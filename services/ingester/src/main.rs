//! Chart ingester.
//!
//! Builds the catalog document from a chart index, then masks and slices
//! the source rasters into dalles.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ingestion::PipelineConfig;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ingester::{build_catalog, run_tiling, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Prepare chart rasters and the catalog for the chart server")]
struct Args {
    /// Pipeline configuration (tiers, special charts, margins)
    #[arg(short, long, global = true, env = "INGESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assign charts to layers and write the catalog document
    Catalog {
        /// Chart index (YAML)
        #[arg(long)]
        index: PathBuf,
        /// Catalog document to write
        #[arg(long, env = "CATALOG_PATH")]
        out: PathBuf,
    },
    /// Mask erasure zones and slice rasters into dalles
    Tile {
        #[arg(long, env = "CATALOG_PATH")]
        catalog: PathBuf,
        /// Directory searched recursively for source rasters
        #[arg(long)]
        sources: PathBuf,
        #[arg(long, env = "TILES_ROOT")]
        tiles_root: PathBuf,
        /// Only process these charts (repeatable)
        #[arg(long)]
        only: Vec<String>,
    },
    /// `catalog` then `tile`
    All {
        #[arg(long)]
        index: PathBuf,
        #[arg(long, env = "CATALOG_PATH")]
        catalog: PathBuf,
        #[arg(long)]
        sources: PathBuf,
        #[arg(long, env = "TILES_ROOT")]
        tiles_root: PathBuf,
        #[arg(long)]
        only: Vec<String>,
    },
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log level")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => PipelineConfig::read(path)
            .with_context(|| format!("loading pipeline configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    info!(tiers = config.tiers.tiers.len(), "Starting chart ingester");

    match args.command {
        Command::Catalog { index, out } => {
            build_catalog(&index, &out, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Tile {
            catalog,
            sources,
            tiles_root,
            only,
        } => tile(&catalog, &sources, &tiles_root, &only, &config),
        Command::All {
            index,
            catalog,
            sources,
            tiles_root,
            only,
        } => {
            build_catalog(&index, &catalog, &config)?;
            tile(&catalog, &sources, &tiles_root, &only, &config)
        }
    }
}

fn tile(
    catalog: &std::path::Path,
    sources: &std::path::Path,
    tiles_root: &std::path::Path,
    only: &[String],
    config: &PipelineConfig,
) -> Result<ExitCode> {
    let report = run_tiling(catalog, sources, tiles_root, only, config)?;
    let summary = RunSummary::from_report(&report);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.is_success() {
        info!(charts = summary.succeeded.len(), dalles = summary.dalles, "Ingestion completed");
        Ok(ExitCode::SUCCESS)
    } else {
        for chart in &summary.failed {
            error!(chart = %chart.name, error = %chart.error, "Chart not ingested");
        }
        Ok(ExitCode::FAILURE)
    }
}
