//! Cutting a chart raster into dalles.

use std::fs;
use std::path::Path;

use image::{ImageFormat, RgbaImage};
use storage::dalles::{dalle_file_name, parse_dalle_file_name};
use storage::DALLE_SIZE;

use crate::error::{IngestionError, Result};

/// Grid size (columns, rows) of a `width`×`height` raster.
pub fn grid_size(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(DALLE_SIZE), height.div_ceil(DALLE_SIZE))
}

/// Write `img` as RGBA PNG dalles into `dir`. The last column and row are
/// cut to the remainder. Returns the number of dalles written.
pub fn slice_raster(img: &RgbaImage, dir: &Path) -> Result<u32> {
    fs::create_dir_all(dir).map_err(|e| IngestionError::io(dir, e))?;

    let (cols, rows) = grid_size(img.width(), img.height());
    for row in 0..rows {
        for col in 0..cols {
            let x = col * DALLE_SIZE;
            let y = row * DALLE_SIZE;
            let w = DALLE_SIZE.min(img.width() - x);
            let h = DALLE_SIZE.min(img.height() - y);
            let dalle = image::imageops::crop_imm(img, x, y, w, h).to_image();

            let path = dir.join(dalle_file_name(col, row));
            dalle
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|e| IngestionError::Image {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
        }
    }
    Ok(cols * rows)
}

/// Reassemble the dalles found in `dir` into one `width`×`height` raster.
/// Missing dalles leave their area transparent.
pub fn assemble_dalles(dir: &Path, width: u32, height: u32) -> Result<RgbaImage> {
    let mut out = RgbaImage::new(width, height);
    let entries = fs::read_dir(dir).map_err(|e| IngestionError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| IngestionError::io(dir, e))?;
        let name = entry.file_name();
        let Some((col, row)) = name.to_str().and_then(parse_dalle_file_name) else {
            continue;
        };
        let path = entry.path();
        let dalle = image::open(&path)
            .map_err(|e| IngestionError::Image {
                path: path.clone(),
                message: e.to_string(),
            })?
            .to_rgba8();
        image::imageops::replace(
            &mut out,
            &dalle,
            (col * DALLE_SIZE) as i64,
            (row * DALLE_SIZE) as i64,
        );
    }
    Ok(out)
}
