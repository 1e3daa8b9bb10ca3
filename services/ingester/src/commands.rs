//! `catalog` and `tile` subcommands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ingestion::{build_document, ChartIndex, ChartOutcome, PipelineConfig, PipelineReport, SourceIndex, TilingPipeline};
use serde::Serialize;
use storage::CatalogDocument;
use tracing::info;

/// Build the catalog document from a chart index and write it to `out`.
///
/// The document is written next to `out` then renamed over it, so a server
/// reloading meanwhile reads either the old document or the new one.
pub fn build_catalog(index: &Path, out: &Path, config: &PipelineConfig) -> Result<CatalogDocument> {
    let index = ChartIndex::read(index).with_context(|| format!("reading chart index {}", index.display()))?;
    let document = build_document(&index, &config.tiers, &config.special_charts);
    let yaml = document.to_yaml().context("serializing catalog document")?;

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = temporary_path(out);
    fs::write(&tmp, yaml).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, out).with_context(|| format!("renaming {} into place", tmp.display()))?;

    let charts: usize = document.layers.values().map(Vec::len).sum();
    info!(path = %out.display(), layers = document.layers.len(), charts, "Catalog document written");
    Ok(document)
}

fn temporary_path(out: &Path) -> PathBuf {
    let mut name = out.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    out.with_file_name(name)
}

/// Mask and slice the charts of the catalog at `catalog`.
pub fn run_tiling(
    catalog: &Path,
    sources: &Path,
    tiles_root: &Path,
    only: &[String],
    config: &PipelineConfig,
) -> Result<PipelineReport> {
    let document = CatalogDocument::read(catalog)
        .with_context(|| format!("reading catalog document {}", catalog.display()))?;
    let index = SourceIndex::scan(sources, &config.source_extensions)
        .with_context(|| format!("scanning sources in {}", sources.display()))?;
    info!(sources = index.len(), dir = %sources.display(), "Source rasters found");

    fs::create_dir_all(tiles_root).with_context(|| format!("creating {}", tiles_root.display()))?;
    let pipeline = TilingPipeline::new(tiles_root, config.clone());
    Ok(pipeline.run(&document, &index, only))
}

/// What the CLI prints at the end of a tiling run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedChart>,
    pub dalles: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedChart {
    pub name: String,
    pub error: String,
}

impl RunSummary {
    pub fn from_report(report: &PipelineReport) -> Self {
        let mut summary = RunSummary {
            succeeded: Vec::new(),
            failed: Vec::new(),
            dalles: 0,
        };
        for outcome in &report.outcomes {
            match outcome {
                ChartOutcome::Succeeded { name, dalles, .. } => {
                    summary.succeeded.push(name.clone());
                    summary.dalles += u64::from(*dalles);
                }
                ChartOutcome::Failed { name, error } => summary.failed.push(FailedChart {
                    name: name.clone(),
                    error: error.clone(),
                }),
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
