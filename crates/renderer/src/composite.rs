//! The compositing engine: catalog entries resampled into one raster.
//!
//! All geometry is in World Mercator meters. Sources are sampled with
//! nearest-neighbour at each destination pixel centre and alpha-blended over
//! what is already drawn, layer after layer, entry after entry.

use std::collections::HashMap;
use std::sync::Arc;

use image::{Pixel, Rgba, RgbaImage};
use rayon::prelude::*;
use rusttype::Font;
use tracing::{debug, instrument};
use wms_common::BoundingBox;

use projection::zoom_for_scale;
use storage::{Catalog, DalleSource, GeoTiff, LayerKind, TierTable, DALLE_SIZE};

use crate::error::{RenderError, Result};
use crate::labels::{draw_label, draw_outline, embedded_font};
use crate::pyramid::select_layers;

/// Engine parameters that do not change between requests.
#[derive(Clone)]
pub struct RenderSettings {
    pub tiers: TierTable,
    /// Share of the target box one chart must cover for the pyramid to drop
    /// coarser tiers.
    pub coverage: f64,
    /// A tier layer requested at a scale more than this many times its
    /// nominal scale is replaced by the overview.
    pub small_scale_factor: f64,
    pub overview_layer: String,
    pub font: Option<Arc<Font<'static>>>,
    pub label_size: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tiers: TierTable::default(),
            coverage: 0.99,
            small_scale_factor: 4.0,
            overview_layer: "gt40M".to_string(),
            font: embedded_font().map(Arc::new),
            label_size: 14.0,
        }
    }
}

impl std::fmt::Debug for RenderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSettings")
            .field("coverage", &self.coverage)
            .field("small_scale_factor", &self.small_scale_factor)
            .field("overview_layer", &self.overview_layer)
            .field("font", &self.font.is_some())
            .finish()
    }
}

/// Mapping between a projected box and a pixel grid.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(bbox: BoundingBox, width: u32, height: u32) -> Self {
        Self { bbox, width, height }
    }

    /// Fractional pixel position of a projected point.
    pub fn to_px(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.bbox.min_x) / self.bbox.width() * self.width as f64,
            (self.bbox.max_y - y) / self.bbox.height() * self.height as f64,
        )
    }

    /// Projected coordinates of a pixel centre.
    pub fn center(&self, px: u32, py: u32) -> (f64, f64) {
        (
            self.bbox.min_x + (px as f64 + 0.5) * self.bbox.width() / self.width as f64,
            self.bbox.max_y - (py as f64 + 0.5) * self.bbox.height() / self.height as f64,
        )
    }

    /// Scale denominator of the view.
    pub fn scale_denominator(&self) -> f64 {
        projection::scale_denominator(self.bbox.width(), self.width)
    }

    /// Pixel window `[x0, x1) × [y0, y1)` of a box, clipped to the canvas.
    fn window(&self, b: &BoundingBox) -> (u32, u32, u32, u32) {
        let (fx0, fy0) = self.to_px(b.min_x, b.max_y);
        let (fx1, fy1) = self.to_px(b.max_x, b.min_y);
        let clip = |v: f64, max: u32| v.round().clamp(0.0, max as f64) as u32;
        (
            clip(fx0, self.width),
            clip(fy0, self.height),
            clip(fx1, self.width),
            clip(fy1, self.height),
        )
    }
}

/// One rendering request against the catalog.
#[derive(Debug, Clone)]
pub struct MapRequest {
    /// Public layer names, drawn in order.
    pub layers: Vec<String>,
    /// Target box, World Mercator.
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
    /// Zoom level for the pyramid; derived from the scale when absent.
    pub zoom: Option<f64>,
    /// Replace tier layers requested far beyond their scale by the overview.
    pub substitute_small_scale: bool,
}

/// Renders [`MapRequest`]s from a catalog and a dalle source.
pub struct Compositor<'a> {
    catalog: &'a Catalog,
    dalles: &'a dyn DalleSource,
    settings: &'a RenderSettings,
}

impl<'a> Compositor<'a> {
    pub fn new(catalog: &'a Catalog, dalles: &'a dyn DalleSource, settings: &'a RenderSettings) -> Self {
        Self {
            catalog,
            dalles,
            settings,
        }
    }

    #[instrument(skip(self, request), fields(layers = ?request.layers, width = request.width, height = request.height))]
    pub fn render(&self, request: &MapRequest) -> Result<RgbaImage> {
        if request.width == 0 || request.height == 0 || !request.bbox.is_valid() {
            return Err(RenderError::InvalidSize {
                width: request.width,
                height: request.height,
            });
        }
        let view = Viewport::new(request.bbox, request.width, request.height);
        let mut canvas = RgbaImage::from_pixel(request.width, request.height, Rgba([0, 0, 0, 0]));

        for name in &request.layers {
            let kind = self
                .catalog
                .resolve_layer(name)
                .ok_or_else(|| RenderError::UnknownLayer(name.clone()))?;
            match kind {
                LayerKind::Pyramid => {
                    let zoom = request
                        .zoom
                        .unwrap_or_else(|| zoom_for_scale(view.scale_denominator()));
                    let layers = select_layers(
                        self.catalog,
                        &self.settings.tiers,
                        &view.bbox,
                        zoom,
                        self.settings.coverage,
                    );
                    debug!(zoom, layers = ?layers, "Pyramid layers selected");
                    for layer in layers {
                        self.draw_layer(&mut canvas, &view, &layer)?;
                    }
                }
                LayerKind::Raster(layer) => {
                    if request.substitute_small_scale && self.is_too_small_scale(&layer, &view) {
                        self.draw_overview(&mut canvas, &view, &layer)?;
                    } else {
                        self.draw_layer(&mut canvas, &view, &layer)?;
                    }
                }
                LayerKind::Labels(layer) => self.draw_labels(&mut canvas, &view, &layer, false),
            }
        }
        Ok(canvas)
    }

    fn is_too_small_scale(&self, layer: &str, view: &Viewport) -> bool {
        if layer == self.settings.overview_layer {
            return false;
        }
        self.settings
            .tiers
            .by_layer(layer)
            .is_some_and(|tier| view.scale_denominator() > self.settings.small_scale_factor * tier.nominal)
    }

    /// The overview layer, plus outline and number of every chart of `layer`
    /// in view.
    fn draw_overview(&self, canvas: &mut RgbaImage, view: &Viewport, layer: &str) -> Result<()> {
        debug!(layer, overview = %self.settings.overview_layer, "Scale too small, drawing overview");
        if self.catalog.layer(&self.settings.overview_layer).is_some() {
            self.draw_layer(canvas, view, &self.settings.overview_layer)?;
        }
        self.draw_labels(canvas, view, layer, true);
        Ok(())
    }

    fn draw_layer(&self, canvas: &mut RgbaImage, view: &Viewport, layer: &str) -> Result<()> {
        let entries = self
            .catalog
            .layer(layer)
            .ok_or_else(|| RenderError::UnknownLayer(layer.to_string()))?;
        for entry in entries {
            self.draw_entry(canvas, view, entry)?;
        }
        Ok(())
    }

    fn draw_labels(&self, canvas: &mut RgbaImage, view: &Viewport, layer: &str, outlines: bool) {
        let Some(entries) = self.catalog.layer(layer) else {
            return;
        };
        let font = self.settings.font.as_deref();
        for entry in entries {
            let Some(interior) = entry.interior.filter(|i| i.intersects(&view.bbox)) else {
                continue;
            };
            let (x0, y0) = view.to_px(interior.min_x, interior.max_y);
            if outlines {
                let (x1, y1) = view.to_px(interior.max_x, interior.min_y);
                draw_outline(
                    canvas,
                    x0.round() as i32,
                    y0.round() as i32,
                    x1.round() as i32,
                    y1.round() as i32,
                );
            }
            draw_label(
                canvas,
                entry.chart_number(),
                x0.round() as i32 + 1,
                y0.round() as i32 + 1,
                font,
                self.settings.label_size,
            );
        }
    }

    /// Resample one entry into the canvas. Returns whether anything was drawn.
    pub fn draw_entry(&self, canvas: &mut RgbaImage, view: &Viewport, entry: &GeoTiff) -> Result<bool> {
        let (Some(interior), Some(exterior), Some((resx, resy))) =
            (entry.interior, entry.exterior, entry.resolution())
        else {
            return Ok(false);
        };
        let Some(common) = interior.intersection(&view.bbox) else {
            return Ok(false);
        };
        let (x0, y0, x1, y1) = view.window(&common);
        if x1 <= x0 || y1 <= y0 {
            debug!(chart = %entry.name, "Degenerate intersection, skipped");
            return Ok(false);
        }

        let (left, top, right, bottom) = entry.interior_window();
        let source_col = |x: f64| {
            (((x - exterior.min_x) / resx).floor() as i64).clamp(left as i64, right as i64 - 1) as u32
        };
        let source_row = |y: f64| {
            (((exterior.max_y - y) / resy).floor() as i64).clamp(top as i64, bottom as i64 - 1) as u32
        };
        let columns: Vec<u32> = (x0..x1).map(|px| source_col(view.center(px, 0).0)).collect();

        let stride = view.width as usize * 4;
        let raw: &mut [u8] = canvas;
        raw.par_chunks_mut(stride)
            .enumerate()
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .try_for_each(|(py, line)| -> Result<()> {
                let row = source_row(view.center(0, py as u32).1);
                let dalle_row = row / DALLE_SIZE;
                let mut dalles: HashMap<u32, Option<Arc<RgbaImage>>> = HashMap::new();

                for (px, &col) in (x0..x1).zip(&columns) {
                    let dalle_col = col / DALLE_SIZE;
                    let dalle = match dalles.get(&dalle_col) {
                        Some(d) => d.clone(),
                        None => {
                            let d = self.dalles.dalle(&entry.name, dalle_col, dalle_row)?;
                            dalles.insert(dalle_col, d.clone());
                            d
                        }
                    };
                    let Some(dalle) = dalle else {
                        continue;
                    };
                    let (sx, sy) = (col % DALLE_SIZE, row % DALLE_SIZE);
                    if sx >= dalle.width() || sy >= dalle.height() {
                        continue;
                    }
                    let i = px as usize * 4;
                    let mut dst = Rgba([line[i], line[i + 1], line[i + 2], line[i + 3]]);
                    dst.blend(dalle.get_pixel(sx, sy));
                    line[i..i + 4].copy_from_slice(&dst.0);
                }
                Ok(())
            })?;
        Ok(true)
    }
}

/// Composite `layers` into a `width × height` raster covering `bbox`
/// (World Mercator). `zoom_hint` steers the pyramid layer.
pub fn composite(
    catalog: &Catalog,
    dalles: &dyn DalleSource,
    settings: &RenderSettings,
    layers: &[String],
    bbox: BoundingBox,
    width: u32,
    height: u32,
    zoom_hint: Option<f64>,
) -> Result<RgbaImage> {
    Compositor::new(catalog, dalles, settings).render(&MapRequest {
        layers: layers.to_vec(),
        bbox,
        width,
        height,
        zoom: zoom_hint,
        substitute_small_scale: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_roundtrip() {
        let view = Viewport::new(BoundingBox::new(0.0, 0.0, 256.0, 128.0), 256, 128);
        assert_eq!(view.center(0, 0), (0.5, 127.5));
        assert_eq!(view.to_px(0.5, 127.5), (0.5, 0.5));
        assert_eq!(view.window(&BoundingBox::new(-10.0, 100.0, 10.2, 200.0)), (0, 0, 10, 28));
    }

    #[test]
    fn test_scale_denominator() {
        let view = Viewport::new(BoundingBox::new(0.0, 0.0, 71.68, 71.68), 256, 256);
        assert!((view.scale_denominator() - 1000.0).abs() < 1e-6);
    }
}
