//! Building the catalog document from a flat chart index.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use storage::{CatalogDocument, ChartRecord, DrawAfter, SpecialCharts, TierTable};
use tracing::{info, warn};

use crate::error::{IngestionError, Result};

/// Charts as delivered, before layer assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartIndex {
    #[serde(default)]
    pub draw_after: Vec<DrawAfter>,
    #[serde(default)]
    pub charts: Vec<ChartRecord>,
}

impl ChartIndex {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| IngestionError::InvalidIndex(e.to_string()))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IngestionError::io(path, e))?;
        Self::from_yaml(&text)
    }
}

/// Layer a chart belongs to: its dedicated layer when special, otherwise
/// the tier matching its scale.
pub fn assign_layer(
    record: &ChartRecord,
    tiers: &TierTable,
    special: &SpecialCharts,
) -> Option<String> {
    if let Some(layer) = special.layer_for(&record.name) {
        return Some(layer.to_string());
    }
    let scale = record.scale_denominator?;
    tiers.assign(scale).map(|t| t.layer_name())
}

/// Group the charts of `index` into layers.
///
/// Charts without a usable scale are left out with a warning. Duplicate
/// names keep the first occurrence. Draw order inside a layer is settled at
/// catalog load, so records keep index order here.
pub fn build_document(
    index: &ChartIndex,
    tiers: &TierTable,
    special: &SpecialCharts,
) -> CatalogDocument {
    let mut layers: BTreeMap<String, Vec<ChartRecord>> = BTreeMap::new();
    let mut seen = std::collections::HashSet::new();

    for record in &index.charts {
        if !seen.insert(record.name.as_str()) {
            warn!(chart = %record.name, "Duplicate chart in index, keeping the first");
            continue;
        }
        match assign_layer(record, tiers, special) {
            Some(layer) => layers.entry(layer).or_default().push(record.clone()),
            None => warn!(chart = %record.name, "Chart has no scale denominator, not cataloged"),
        }
    }

    info!(
        charts = seen.len(),
        layers = layers.len(),
        "Catalog document built"
    );
    CatalogDocument {
        draw_after: index.draw_after.clone(),
        layers,
    }
}
