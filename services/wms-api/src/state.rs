//! Application state and shared resources.

use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use renderer::{embedded_font, load_font, RenderSettings};
use storage::{CacheKey, CacheMode, Catalog, CatalogLoader, FsDalleStore, TileCache};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::metrics::MetricsCollector;

/// Outcome of a catalog reload.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReloadSummary {
    pub rebuilt: bool,
    pub entries: usize,
    /// Output tiles removed because the catalog changed.
    pub cache_cleared: u64,
}

/// Shared application state.
///
/// The catalog is replaced wholesale on reload; requests hold their own
/// `Arc` to the generation they started with. Tiles rendered from a
/// generation that a rebuild has since replaced are never cached.
pub struct AppState {
    pub config: ServerConfig,
    catalog: RwLock<Arc<Catalog>>,
    /// Catalog generation. Cache writes hold it shared, rebuilds exclusively.
    generation: RwLock<u64>,
    loader: CatalogLoader,
    pub dalles: FsDalleStore,
    pub cache: TileCache,
    pub settings: RenderSettings,
    pub metrics: Arc<MetricsCollector>,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Load the catalog and set up the stores. A missing catalog is fatal.
    pub fn new(config: ServerConfig, prometheus: Option<PrometheusHandle>) -> Result<Self> {
        let loader = CatalogLoader::new(
            &config.catalog_path,
            &config.catalog_cache_path,
            config.border_default_px,
        );
        let loaded = loader.load(None).context("loading chart catalog")?;
        info!(
            entries = loaded.catalog.len(),
            rebuilt = loaded.rebuilt,
            "Catalog ready"
        );

        let configured = config.label_font_path.as_ref().and_then(|path| match load_font(path) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Label font unusable, using the bundled one");
                None
            }
        });
        let font = configured.or_else(embedded_font).map(Arc::new);

        let settings = RenderSettings {
            coverage: config.pyramid_coverage,
            small_scale_factor: config.small_scale_factor,
            overview_layer: config.overview_layer.clone(),
            font,
            ..RenderSettings::default()
        };

        let cache = TileCache::new(&config.cache_root, config.cache_policy());
        if loaded.rebuilt {
            // tiles rendered from an older catalog are stale
            let removed = cache.clear().context("clearing tile cache")?;
            if removed > 0 {
                info!(removed, "Stale output tiles removed");
            }
        }

        Ok(Self {
            dalles: FsDalleStore::new(&config.tiles_root, config.dalle_cache_mb),
            cache,
            settings,
            catalog: RwLock::new(Arc::new(loaded.catalog)),
            generation: RwLock::new(0),
            loader,
            metrics: Arc::new(MetricsCollector::new()),
            prometheus,
            config,
        })
    }

    /// The current catalog generation.
    pub async fn catalog(&self) -> Arc<Catalog> {
        self.catalog.read().await.clone()
    }

    /// The current catalog with its generation, read as one pair.
    pub async fn snapshot(&self) -> (Arc<Catalog>, u64) {
        let generation = self.generation.read().await;
        (self.catalog().await, *generation)
    }

    /// Cache a tile rendered from catalog `generation`. Tiles from a replaced
    /// generation are dropped. Returns whether anything was written.
    pub async fn store_tile(&self, key: CacheKey, data: Vec<u8>, generation: u64) -> Result<bool> {
        let current = self.generation.read().await;
        if *current != generation {
            debug!(key = %key, generation, current = *current, "Dropping tile rendered from a replaced catalog");
            return Ok(false);
        }
        let cache = self.cache.clone();
        let written = tokio::task::spawn_blocking(move || cache.write(&key, &data, CacheMode::Normal))
            .await
            .context("cache write task")??;
        drop(current);
        Ok(written)
    }

    /// Reload the catalog from disk, rebuilding from the document when the
    /// cache predates `rebuild_before`. A rebuilt catalog invalidates the
    /// output tile cache and the decoded dalles.
    ///
    /// The new catalog is installed before the cache is cleared, and pending
    /// cache writes finish first, so no tile of the old catalog survives.
    pub async fn reload(&self, rebuild_before: Option<SystemTime>) -> Result<ReloadSummary> {
        let loader = self.loader.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load(rebuild_before))
            .await
            .context("catalog reload task")??;

        let rebuilt = loaded.rebuilt;
        let entries = loaded.catalog.len();
        let catalog = Arc::new(loaded.catalog);
        if !rebuilt {
            *self.catalog.write().await = catalog;
            info!(rebuilt, entries, "Catalog reloaded");
            return Ok(ReloadSummary {
                rebuilt,
                entries,
                cache_cleared: 0,
            });
        }

        let mut generation = self.generation.write().await;
        *self.catalog.write().await = catalog;
        *generation += 1;
        self.dalles.clear();
        let cache = self.cache.clone();
        let cache_cleared = tokio::task::spawn_blocking(move || cache.clear())
            .await
            .context("cache clear task")??;
        drop(generation);

        info!(rebuilt, entries, cache_cleared, "Catalog reloaded");
        Ok(ReloadSummary {
            rebuilt,
            entries,
            cache_cleared,
        })
    }
}
