//! Chart ingestion.
//!
//! Turns delivered chart rasters into what the map server reads:
//!
//! - [`catalog_build`]: assigns charts to scale tiers or special layers and
//!   writes the catalog document
//! - [`erasure`]: clears erasure zones to transparency
//! - [`slicing`]: cuts rasters into 1024 px dalles named by hex grid position
//! - [`pipeline`]: runs masking and slicing for a whole catalog, chart by
//!   chart, through a staging directory

pub mod catalog_build;
pub mod config;
pub mod erasure;
pub mod error;
pub mod pipeline;
pub mod slicing;

pub use catalog_build::{assign_layer, build_document, ChartIndex};
pub use config::PipelineConfig;
pub use erasure::{apply_erasures, Georef};
pub use error::{IngestionError, Result};
pub use pipeline::{ChartOutcome, PipelineReport, SourceIndex, TilingPipeline, STAGING_DIR};
pub use slicing::{assemble_dalles, grid_size, slice_raster};
