//! Synthetic raster generators.
//!
//! These generators create predictable, verifiable images that can be used
//! across the test suite without shipping scanned charts.

use image::{Rgba, RgbaImage};

/// Creates a test raster with a pixel pattern derived from its position.
///
/// Pixel `(x, y)` is `[x % 256, y % 256, (x / 256 + 16 * (y / 256)) % 256, 255]`,
/// so every pixel of rasters up to 4096×4096 is distinct and a test can tell
/// exactly where a sampled pixel came from with [`expected_test_pixel`].
///
/// # Example
///
/// ```
/// use test_utils::{create_test_raster, expected_test_pixel};
///
/// let img = create_test_raster(300, 20);
/// assert_eq!(img.get_pixel(257, 3).0, expected_test_pixel(257, 3));
/// assert_eq!(img.get_pixel(257, 3).0, [1, 3, 1, 255]);
/// ```
pub fn create_test_raster(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| Rgba(expected_test_pixel(x, y)))
}

/// The pixel [`create_test_raster`] places at `(x, y)`.
pub fn expected_test_pixel(x: u32, y: u32) -> [u8; 4] {
    [
        (x % 256) as u8,
        (y % 256) as u8,
        ((x / 256 + 16 * (y / 256)) % 256) as u8,
        255,
    ]
}

/// Creates a raster filled with one colour.
pub fn create_solid_raster(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

/// Creates a raster with an opaque `rgba` interior and a `margin`-pixel
/// frame of `border` colour, the layout of a scanned chart with its collar.
pub fn create_framed_raster(
    width: u32,
    height: u32,
    margin: u32,
    rgba: [u8; 4],
    border: [u8; 4],
) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let inside = x >= margin
            && y >= margin
            && x + margin < width
            && y + margin < height;
        Rgba(if inside { rgba } else { border })
    })
}

/// Count pixels of `img` equal to `rgba`.
pub fn count_pixels(img: &RgbaImage, rgba: [u8; 4]) -> usize {
    img.pixels().filter(|p| p.0 == rgba).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_pixels_unique() {
        let img = create_test_raster(600, 600);
        let mut seen = std::collections::HashSet::new();
        for p in img.pixels() {
            assert!(seen.insert(p.0));
        }
    }

    #[test]
    fn test_framed_raster() {
        let img = create_framed_raster(10, 10, 2, [255, 0, 0, 255], [0, 0, 0, 255]);
        assert_eq!(count_pixels(&img, [255, 0, 0, 255]), 36);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(9, 9).0, [0, 0, 0, 255]);
    }
}
