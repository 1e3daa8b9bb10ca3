//! Catalog and on-disk storage for the chart server.
//!
//! Provides:
//! - The YAML catalog document model and the [`Catalog`] built from it
//! - Scale tiers, special-chart layers and draw-order fix-ups
//! - Dalle access (filesystem with an LRU of decoded images, or in memory)
//! - The disk cache of rendered output tiles

pub mod cache;
pub mod catalog;
pub mod dalles;
pub mod document;
pub mod error;
pub mod geotiff;
pub mod tiers;

pub use cache::{CacheKey, CacheMode, CachePolicy, TileCache};
pub use catalog::{Catalog, CatalogLoader, LayerKind, LoadedCatalog};
pub use dalles::{DalleSource, FsDalleStore, MemoryDalleStore, DALLE_SIZE};
pub use document::{CatalogDocument, ChartRecord, Coord, DrawAfter, RectRecord, ZoneRecord};
pub use error::{Result, StorageError};
pub use geotiff::{GeoTiff, Margins, Zone};
pub use tiers::{reorder, SpecialCharts, Tier, TierTable, LABEL_PREFIX, PYRAMID_LAYER};
