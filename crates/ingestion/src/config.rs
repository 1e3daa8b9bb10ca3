//! Pipeline configuration.
//!
//! Optional YAML file; every field has a default so an empty document is a
//! valid configuration.
//!
//! ```yaml
//! specialCharts:
//!   aem: ["7330", "7344"]
//!   mancheGrid: ["8101"]
//!   zonMar: ["8510"]
//! tiers:                       # replaces the built-in table
//!   - { name: 50k, nominal: 50000 }
//! borderDefault: 400
//! sourceExtensions: [tif, png]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use storage::{SpecialCharts, TierTable};

use crate::error::{IngestionError, Result};

/// Settings shared by catalog building and tiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub special_charts: SpecialCharts,
    pub tiers: TierTable,
    /// Margin width used when a record's margins are unusable.
    pub border_default: u32,
    /// Source raster extensions, in lookup order.
    pub source_extensions: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            special_charts: SpecialCharts::default(),
            tiers: TierTable::default(),
            border_default: 400,
            source_extensions: ["tif", "tiff", "png", "jpg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| IngestionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IngestionError::io(path, e))?;
        Self::from_yaml(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.tiers.tiers.is_empty() {
            return Err(IngestionError::InvalidConfig("tier table is empty".to_string()));
        }
        for pair in self.tiers.tiers.windows(2) {
            if pair[1].nominal <= pair[0].nominal {
                return Err(IngestionError::InvalidConfig(format!(
                    "tier {} must accept larger denominators than {}",
                    pair[1].name, pair[0].name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(PipelineConfig::from_yaml("{}").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_yaml(
            r#"
specialCharts:
  aem: ["9999"]
  mancheGrid: []
  zonMar: []
tiers:
  - { name: 50k, nominal: 50000 }
  - { name: 1M, nominal: 1000000 }
borderDefault: 50
"#,
        )
        .unwrap();
        assert_eq!(config.special_charts.layer_for("9999_pal300"), Some("gtaem"));
        assert_eq!(config.special_charts.layer_for("7330_pal300"), None);
        assert_eq!(config.tiers.tiers.len(), 2);
        assert_eq!(config.border_default, 50);
        assert_eq!(config.source_extensions, PipelineConfig::default().source_extensions);
    }

    #[test]
    fn test_tier_bounds_come_from_nominal() {
        let err = PipelineConfig::from_yaml("tiers:\n  - { name: 50k, nominal: 50000, max: 90000 }\n")
            .unwrap_err();
        assert!(matches!(err, IngestionError::InvalidConfig(_)));

        let config = PipelineConfig::from_yaml(
            "tiers:\n  - { name: 50k, nominal: 50000 }\n  - { name: 1M, nominal: 1000000 }\n",
        )
        .unwrap();
        assert_eq!(config.tiers.assign(60_000.0).unwrap().name, "1M");
    }

    #[test]
    fn test_unordered_tiers_rejected() {
        let err = PipelineConfig::from_yaml(
            r#"
tiers:
  - { name: 1M, nominal: 1000000 }
  - { name: 50k, nominal: 50000 }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, IngestionError::InvalidConfig(_)));
    }
}
