//! The tiling pipeline: for every cataloged chart, mask its erasure zones,
//! slice it into dalles in a staging directory, then move the result into
//! place under the tiles root.
//!
//! Charts are processed in parallel and independently; a failure is
//! recorded for that chart and the others carry on.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use storage::{CatalogDocument, ChartRecord, GeoTiff};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::erasure::apply_erasures;
use crate::error::{IngestionError, Result};
use crate::slicing::slice_raster;

/// Directory under the tiles root where charts are built before publishing.
pub const STAGING_DIR: &str = ".staging";

/// Source rasters found under a directory, keyed by file stem.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    by_stem: HashMap<String, PathBuf>,
}

impl SourceIndex {
    /// Index every file under `dir` whose extension is in `extensions`.
    /// When a stem exists with several extensions the earliest listed wins.
    pub fn scan(dir: &Path, extensions: &[String]) -> Result<Self> {
        if !dir.is_dir() {
            return Err(IngestionError::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source directory not found"),
            ));
        }
        let rank = |path: &Path| {
            let ext = path.extension()?.to_str()?.to_ascii_lowercase();
            extensions.iter().position(|e| *e == ext)
        };

        let mut by_stem: HashMap<String, PathBuf> = HashMap::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let (Some(stem), Some(r)) = (path.file_stem().and_then(|s| s.to_str()), rank(&path))
            else {
                continue;
            };
            let stem = stem.to_string();
            let better = by_stem
                .get(&stem)
                .and_then(|p| rank(p))
                .map_or(true, |existing| r < existing);
            if better {
                by_stem.insert(stem, path);
            }
        }
        Ok(Self { by_stem })
    }

    pub fn find(&self, chart: &str) -> Option<&Path> {
        self.by_stem.get(chart).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }
}

/// Result of one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Succeeded { name: String, dalles: u32, erased: u64 },
    Failed { name: String, error: String },
}

impl ChartOutcome {
    pub fn name(&self) -> &str {
        match self {
            ChartOutcome::Succeeded { name, .. } | ChartOutcome::Failed { name, .. } => name,
        }
    }
}

/// Per-chart results of a run, in chart name order.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub outcomes: Vec<ChartOutcome>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ChartOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChartOutcome::Succeeded { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &ChartOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChartOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

pub struct TilingPipeline {
    tiles_root: PathBuf,
    config: PipelineConfig,
}

impl TilingPipeline {
    pub fn new(tiles_root: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        Self {
            tiles_root: tiles_root.into(),
            config,
        }
    }

    pub fn staging_dir(&self, chart: &str) -> PathBuf {
        self.tiles_root.join(STAGING_DIR).join(chart)
    }

    pub fn chart_dir(&self, chart: &str) -> PathBuf {
        self.tiles_root.join(chart)
    }

    /// Process every chart of `document`, or only those named in `only`
    /// when it is not empty.
    pub fn run(&self, document: &CatalogDocument, sources: &SourceIndex, only: &[String]) -> PipelineReport {
        let started = Instant::now();

        let mut charts: Vec<(&str, &ChartRecord)> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for (layer, records) in &document.layers {
            for record in records {
                if (only.is_empty() || only.contains(&record.name)) && seen.insert(&record.name) {
                    charts.push((layer.as_str(), record));
                }
            }
        }
        charts.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        for name in only.iter().filter(|n| !seen.contains(n)) {
            warn!(chart = %name, "Requested chart is not in the catalog");
        }

        info!(charts = charts.len(), "Tiling started");
        let outcomes: Vec<ChartOutcome> = charts
            .par_iter()
            .map(|(layer, record)| {
                match self.process_chart(layer, record, sources.find(&record.name)) {
                    Ok((dalles, erased)) => {
                        info!(chart = %record.name, dalles, erased, "Chart tiled");
                        ChartOutcome::Succeeded {
                            name: record.name.clone(),
                            dalles,
                            erased,
                        }
                    }
                    Err(e) => {
                        error!(chart = %record.name, error = %e, "Chart failed");
                        ChartOutcome::Failed {
                            name: record.name.clone(),
                            error: e.to_string(),
                        }
                    }
                }
            })
            .collect();

        // only removes it when nothing is left behind
        let _ = fs::remove_dir(self.tiles_root.join(STAGING_DIR));

        let report = PipelineReport { outcomes };
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tiling finished"
        );
        report
    }

    /// Mask, slice and publish one chart. Returns (dalles, erased pixels).
    pub fn process_chart(
        &self,
        layer: &str,
        record: &ChartRecord,
        source: Option<&Path>,
    ) -> Result<(u32, u64)> {
        let source = source.ok_or_else(|| IngestionError::SourceNotFound(record.name.clone()))?;
        let entry = GeoTiff::from_record(layer, record, self.config.border_default)?
            .into_iter()
            .next()
            .ok_or_else(|| IngestionError::NotGeoreferenced {
                name: record.name.clone(),
            })?;

        let mut img = image::open(source)
            .map_err(|e| IngestionError::Image {
                path: source.to_path_buf(),
                message: e.to_string(),
            })?
            .to_rgba8();
        if img.dimensions() != (record.width, record.height) {
            return Err(IngestionError::SizeMismatch {
                name: record.name.clone(),
                width: record.width,
                height: record.height,
                actual_width: img.width(),
                actual_height: img.height(),
            });
        }

        let erased = apply_erasures(&mut img, &entry)?;

        let staging = self.staging_dir(&record.name);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| IngestionError::io(&staging, e))?;
        }
        let dalles = slice_raster(&img, &staging)?;
        self.publish(&record.name, &staging)?;
        Ok((dalles, erased))
    }

    /// Swap the staged dalles into place. The previous version is moved
    /// aside first so readers never see a half-written directory.
    fn publish(&self, chart: &str, staging: &Path) -> Result<()> {
        let target = self.chart_dir(chart);
        let retired = self.tiles_root.join(STAGING_DIR).join(format!("{}.old", chart));

        if retired.exists() {
            fs::remove_dir_all(&retired).map_err(|e| IngestionError::io(&retired, e))?;
        }
        if target.exists() {
            fs::rename(&target, &retired).map_err(|e| IngestionError::io(&target, e))?;
        }
        fs::rename(staging, &target).map_err(|e| IngestionError::io(staging, e))?;
        if retired.exists() {
            fs::remove_dir_all(&retired).map_err(|e| IngestionError::io(&retired, e))?;
        }
        Ok(())
    }
}
