//! Map rendering for the chart server.
//!
//! - Compositing of catalog entries into a target box, with z-order and alpha
//! - Pyramid tier selection
//! - Chart numbers and outlines
//! - PNG (in-house encoder) and JPEG output

pub mod composite;
pub mod encode;
pub mod error;
pub mod labels;
pub mod png;
pub mod pyramid;

pub use composite::{composite, Compositor, MapRequest, RenderSettings, Viewport};
pub use encode::{encode, flatten, parse_bgcolor, EncodeOptions, OutputFormat};
pub use error::{RenderError, Result};
pub use labels::{embedded_font, load_font};
pub use pyramid::select_layers;
