//! Chart numbers and outlines drawn over composited maps.

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};

use crate::error::{RenderError, Result};

const TEXT_COLOR: Rgba<u8> = Rgba([180, 0, 90, 255]);
const SWATCH_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE_COLOR: Rgba<u8> = Rgba([180, 0, 90, 255]);
const PADDING: i32 = 2;

/// DejaVu Sans Mono, used unless another font is configured.
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// The bundled label font.
pub fn embedded_font() -> Option<Font<'static>> {
    Font::try_from_bytes(FONT_DATA)
}

/// Load a TrueType font for labels.
pub fn load_font(path: &Path) -> Result<Font<'static>> {
    let bytes = std::fs::read(path)
        .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;
    Font::try_from_vec(bytes)
        .ok_or_else(|| RenderError::Font(format!("{}: not a TrueType font", path.display())))
}

/// Size of the label text in pixels. Without a font, an estimate from the
/// character count.
fn label_extent(text: &str, font: Option<&Font<'_>>, size: f32) -> (i32, i32) {
    match font {
        Some(font) => text_size(Scale::uniform(size), font, text),
        None => ((text.chars().count() as f32 * size * 0.6) as i32, size as i32),
    }
}

/// Draw `text` with its top-left corner at `(x, y)` on a white swatch.
///
/// The label is pushed inside the canvas when the anchor lies outside it.
/// Without a font only the swatch is drawn.
pub fn draw_label(img: &mut RgbaImage, text: &str, x: i32, y: i32, font: Option<&Font<'_>>, size: f32) {
    if text.is_empty() || img.width() == 0 || img.height() == 0 {
        return;
    }
    let (tw, th) = label_extent(text, font, size);
    let sw = tw + 2 * PADDING;
    let sh = th + 2 * PADDING;
    let x = x.clamp(0, (img.width() as i32 - sw).max(0));
    let y = y.clamp(0, (img.height() as i32 - sh).max(0));

    if sw > 0 && sh > 0 {
        draw_filled_rect_mut(img, Rect::at(x, y).of_size(sw as u32, sh as u32), SWATCH_COLOR);
    }
    if let Some(font) = font {
        draw_text_mut(img, TEXT_COLOR, x + PADDING, y + PADDING, Scale::uniform(size), font, text);
    }
}

/// Outline a pixel rectangle, corners inclusive-exclusive.
pub fn draw_outline(img: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32) {
    if x1 - x0 < 1 || y1 - y0 < 1 {
        return;
    }
    draw_hollow_rect_mut(
        img,
        Rect::at(x0, y0).of_size((x1 - x0) as u32, (y1 - y0) as u32),
        OUTLINE_COLOR,
    );
}
