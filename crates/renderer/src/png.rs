//! PNG encoding for RGBA image data.
//!
//! Supports two encoding modes:
//! - **Indexed PNG (color type 3)**: Used when image has ≤256 unique colors.
//!   Scanned charts rarely qualify, but label layers and mostly-empty tiles do.
//! - **RGBA PNG (color type 6)**: Fallback for images with >256 colors.
//!
//! The palette is built in first-appearance order, so equal pixels always
//! encode to equal bytes.

use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;

use crate::error::{RenderError, Result};

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel index mapping
const PARALLEL_THRESHOLD: usize = 65_536;

type Palette = Vec<[u8; 4]>;

/// Encode RGBA pixels, choosing indexed or RGBA output.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_len(pixels, width, height)?;
    match extract_palette(pixels) {
        Some((palette, indices)) => create_png_indexed(width, height, &palette, &indices),
        None => create_png(pixels, width, height),
    }
}

fn check_len(pixels: &[u8], width: usize, height: usize) -> Result<()> {
    if pixels.len() != width * height * 4 {
        return Err(RenderError::Encode(format!(
            "{} bytes for a {}x{} RGBA image",
            pixels.len(),
            width,
            height
        )));
    }
    Ok(())
}

#[inline(always)]
fn pack_color(p: &[u8]) -> u32 {
    u32::from_le_bytes([p[0], p[1], p[2], p[3]])
}

/// Palette in first-appearance order plus one index per pixel, or `None`
/// past 256 colours.
fn extract_palette(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);

    // Runs of identical pixels are the norm; skip the hash lookup for them.
    let mut last: Option<u32> = None;
    for chunk in pixels.chunks_exact(4) {
        let packed = pack_color(chunk);
        if last == Some(packed) {
            continue;
        }
        last = Some(packed);
        if !color_to_index.contains_key(&packed) {
            if palette.len() >= MAX_PALETTE_SIZE {
                return None;
            }
            color_to_index.insert(packed, palette.len() as u8);
            palette.push([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }

    let lookup = |chunk: &[u8]| color_to_index.get(&pack_color(chunk)).copied().unwrap_or(0);
    let indices = if pixels.len() / 4 >= PARALLEL_THRESHOLD {
        pixels.par_chunks_exact(4).map(lookup).collect()
    } else {
        pixels.chunks_exact(4).map(lookup).collect()
    };

    Some((palette, indices))
}

/// Create an indexed PNG (color type 3) from palette and indices.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[[u8; 4]],
    indices: &[u8],
) -> Result<Vec<u8>> {
    let mut png = Vec::new();

    // PNG signature
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte_data: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte_data);

    // tRNS only if any entry is not opaque
    if palette.iter().any(|c| c[3] < 255) {
        let trns_data: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns_data);
    }

    let idat_data = deflate_scanlines(indices, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create a PNG image from RGBA pixel data (color type 6).
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_len(pixels, width, height)?;
    let mut png = Vec::new();

    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));

    let idat_data = deflate_scanlines(pixels, width * 4, height)?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn ihdr(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&(width as u32).to_be_bytes());
    data.extend_from_slice(&(height as u32).to_be_bytes());
    data.push(8); // bit depth
    data.push(color_type);
    data.push(0); // compression method
    data.push(0); // filter method
    data.push(0); // interlace method
    data
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each `row_bytes`-wide scanline with filter 0 and deflate.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize) -> Result<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + row_bytes));
    for row in data.chunks_exact(row_bytes.max(1)).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder
        .write_all(&uncompressed)
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_palette_first_appearance_order() {
        let pixels = [
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            0, 0, 255, 255, // blue
            255, 0, 0, 255, // red again
        ];

        let (palette, indices) = extract_palette(&pixels).unwrap();
        assert_eq!(palette, vec![[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]]);
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_too_many_colors() {
        let pixels: Vec<u8> = (0..300u32).flat_map(|i| [i as u8, (i >> 8) as u8, 0, 255]).collect();
        assert!(extract_palette(&pixels).is_none());
    }

    #[test]
    fn test_indexed_png_decodes() {
        let mut pixels = Vec::new();
        for y in 0..16u8 {
            for x in 0..16u8 {
                let a = if (x + y) % 2 == 0 { 255 } else { 0 };
                pixels.extend_from_slice(&[x * 10, y * 10, 0, a]);
            }
        }
        let png = create_png_auto(&pixels, 16, 16).unwrap();
        // color type 3
        assert_eq!(png[25], 3);
        let decoded = image::load_from_memory(&png).unwrap().into_rgba8();
        assert_eq!(decoded.as_raw(), &pixels);
    }

    #[test]
    fn test_rgba_png_decodes() {
        let pixels: Vec<u8> = (0..64u32 * 64)
            .flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 7, 255])
            .collect();
        let png = create_png_auto(&pixels, 64, 64).unwrap();
        assert_eq!(png[25], 6);
        let decoded = image::load_from_memory(&png).unwrap().into_rgba8();
        assert_eq!(decoded.as_raw(), &pixels);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(create_png_auto(&[0, 0, 0], 1, 1).is_err());
    }
}
