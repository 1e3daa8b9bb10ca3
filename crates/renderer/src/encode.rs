//! Output image formats.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::{RenderError, Result};
use crate::png::create_png_auto;

/// JPEG quality for map output.
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Parse a WMS FORMAT value.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" | "png" | "image/png8" => Some(OutputFormat::Png),
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

/// How to encode a composited buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub format: OutputFormat,
    /// Keep alpha (PNG only). When false, pixels are flattened onto `background`.
    pub transparent: bool,
    pub background: [u8; 3],
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            transparent: true,
            background: [255, 255, 255],
        }
    }
}

/// Parse a WMS BGCOLOR value, `0xRRGGBB` or `#RRGGBB`.
pub fn parse_bgcolor(value: &str) -> Option<[u8; 3]> {
    let hex = value
        .trim()
        .strip_prefix("0x")
        .or_else(|| value.trim().strip_prefix("0X"))
        .or_else(|| value.trim().strip_prefix('#'))?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Composite `img` over an opaque background.
pub fn flatten(img: &RgbaImage, background: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        let mix = |fg: u8, bg: u8| {
            ((fg as u32 * a as u32 + bg as u32 * (255 - a as u32) + 127) / 255) as u8
        };
        Rgb([
            mix(r, background[0]),
            mix(g, background[1]),
            mix(b, background[2]),
        ])
    })
}

/// Encode a composited buffer.
pub fn encode(img: &RgbaImage, options: &EncodeOptions) -> Result<Vec<u8>> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    match options.format {
        OutputFormat::Png if options.transparent => create_png_auto(img.as_raw(), width, height),
        OutputFormat::Png => {
            let flat = flatten(img, options.background);
            let rgba: Vec<u8> = flat.pixels().flat_map(|p| [p[0], p[1], p[2], 255]).collect();
            create_png_auto(&rgba, width, height)
        }
        OutputFormat::Jpeg => {
            let flat = flatten(img, options.background);
            let mut out = Cursor::new(Vec::new());
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
                .encode_image(&flat)
                .map_err(|e| RenderError::Encode(e.to_string()))?;
            Ok(out.into_inner())
        }
    }
}
