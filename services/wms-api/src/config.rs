//! Server configuration from the environment.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use storage::{CachePolicy, PYRAMID_LAYER};

/// Everything the server reads from its environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// YAML catalog document.
    pub catalog_path: PathBuf,
    /// Binary catalog cache next to it.
    pub catalog_cache_path: PathBuf,
    /// Root of the dalle tree.
    pub tiles_root: PathBuf,
    /// Root of the output tile cache.
    pub cache_root: PathBuf,
    /// Public URL used in capabilities and tile documents; derived from the
    /// Host header when unset.
    pub public_base_url: Option<String>,
    pub label_font_path: Option<PathBuf>,
    pub cache_layers: HashSet<String>,
    pub cache_max_zoom: u32,
    pub small_scale_factor: f64,
    pub pyramid_coverage: f64,
    pub overview_layer: String,
    pub dalle_cache_mb: usize,
    pub border_default_px: u32,
    /// `max-age` of tile responses, seconds.
    pub tile_max_age: u32,
}

impl ServerConfig {
    /// Defaults rooted at `data_dir`, the layout used by the container image.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let policy = CachePolicy::default();
        Self {
            catalog_path: data_dir.join("catalog.yaml"),
            catalog_cache_path: data_dir.join("catalog.bin"),
            tiles_root: data_dir.join("tiles"),
            cache_root: data_dir.join("cache"),
            public_base_url: None,
            label_font_path: None,
            cache_layers: policy.layers,
            cache_max_zoom: policy.max_zoom,
            small_scale_factor: 4.0,
            pyramid_coverage: 0.99,
            overview_layer: "gt40M".to_string(),
            dalle_cache_mb: 256,
            border_default_px: 400,
            tile_max_age: 3600,
        }
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::with_data_dir(env::var("DATA_DIR").unwrap_or_else(|_| "/data".to_string()));

        let cache_layers = match env::var("CACHE_LAYERS") {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => HashSet::from([PYRAMID_LAYER.to_string()]),
        };

        Ok(Self {
            catalog_path: env_path("CATALOG_PATH").unwrap_or(defaults.catalog_path),
            catalog_cache_path: env_path("CATALOG_CACHE_PATH").unwrap_or(defaults.catalog_cache_path),
            tiles_root: env_path("TILES_ROOT").unwrap_or(defaults.tiles_root),
            cache_root: env_path("CACHE_ROOT").unwrap_or(defaults.cache_root),
            public_base_url: env::var("PUBLIC_BASE_URL").ok().filter(|s| !s.is_empty()),
            label_font_path: env_path("LABEL_FONT_PATH"),
            cache_layers,
            cache_max_zoom: env_parse("CACHE_MAX_ZOOM", defaults.cache_max_zoom)?,
            small_scale_factor: env_parse("SMALL_SCALE_FACTOR", defaults.small_scale_factor)?,
            pyramid_coverage: env_parse("PYRAMID_COVERAGE", defaults.pyramid_coverage)?,
            overview_layer: env::var("OVERVIEW_LAYER").unwrap_or(defaults.overview_layer),
            dalle_cache_mb: env_parse("DALLE_CACHE_MB", defaults.dalle_cache_mb)?,
            border_default_px: env_parse("BORDER_DEFAULT_PX", defaults.border_default_px)?,
            tile_max_age: env_parse("TILE_MAX_AGE", defaults.tile_max_age)?,
        })
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            layers: self.cache_layers.clone(),
            max_zoom: self.cache_max_zoom,
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, v)),
        _ => Ok(default),
    }
}
