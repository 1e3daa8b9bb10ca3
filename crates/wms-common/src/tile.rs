//! XYZ tile addressing.

use serde::{Deserialize, Serialize};

/// Deepest zoom level served.
pub const MAX_ZOOM: u32 = 20;

/// A tile coordinate (z/x/y), top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along each axis at this zoom level.
    pub fn matrix_size(&self) -> u32 {
        1u32 << self.z.min(31)
    }

    /// True when z is served and x/y fall inside the tile matrix.
    pub fn is_valid(&self) -> bool {
        self.z <= MAX_ZOOM && self.x < self.matrix_size() && self.y < self.matrix_size()
    }

    /// Relative path fragment "z/x/y".
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }
}
