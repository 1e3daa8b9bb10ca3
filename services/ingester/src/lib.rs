//! Chart ingestion commands.
//!
//! The binary is a thin clap front-end over these functions.

pub mod commands;

pub use commands::{build_catalog, run_tiling, RunSummary};
