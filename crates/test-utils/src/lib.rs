//! Shared test utilities for the nautical-chart-wms workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Floating-point assertion macros
//! - Synthetic raster generators with predictable pixels
//! - Catalog document fixtures and temporary data directories
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures, create_test_raster};
//! ```

pub mod fixtures;
pub mod generators;
pub mod workspace;

// Re-export commonly used items at the crate root
pub use generators::*;
pub use workspace::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for approximate equality of two bounding boxes, compared field by field.
///
/// Works with any value exposing `min_x`, `min_y`, `max_x`, `max_y`.
#[macro_export]
macro_rules! assert_bbox_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let l = &$left;
        let r = &$right;
        $crate::assert_approx_eq!(l.min_x, r.min_x, $epsilon);
        $crate::assert_approx_eq!(l.min_y, r.min_y, $epsilon);
        $crate::assert_approx_eq!(l.max_x, r.max_x, $epsilon);
        $crate::assert_approx_eq!(l.max_y, r.max_y, $epsilon);
    }};
}
