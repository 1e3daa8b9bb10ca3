//! Temporary data directories laid out like a deployed server.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tempfile::TempDir;

/// A throwaway data tree:
///
/// ```text
/// <root>/catalog.yaml
/// <root>/catalog.bin
/// <root>/tiles/<gtname>/<col>-<row>.png
/// <root>/cache/
/// ```
///
/// Everything is deleted when the value is dropped.
pub struct TestDataDir {
    dir: TempDir,
}

impl TestDataDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(dir.path().join("tiles")).expect("create tiles dir");
        fs::create_dir_all(dir.path().join("cache")).expect("create cache dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root().join("catalog.yaml")
    }

    pub fn catalog_cache_path(&self) -> PathBuf {
        self.root().join("catalog.bin")
    }

    pub fn tiles_root(&self) -> PathBuf {
        self.root().join("tiles")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.root().join("cache")
    }

    /// Write the catalog document.
    pub fn write_catalog(&self, yaml: &str) -> PathBuf {
        let path = self.catalog_path();
        fs::write(&path, yaml).expect("write catalog");
        path
    }

    /// Write one dalle under `tiles/<gtname>/<col:x>-<row:x>.png`.
    pub fn write_dalle(&self, gtname: &str, col: u32, row: u32, img: &RgbaImage) -> PathBuf {
        let dir = self.tiles_root().join(gtname);
        fs::create_dir_all(&dir).expect("create dalle dir");
        let path = dir.join(format!("{:x}-{:x}.png", col, row));
        img.save(&path).expect("write dalle");
        path
    }
}

impl Default for TestDataDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_solid_raster;

    #[test]
    fn test_layout() {
        let data = TestDataDir::new();
        assert!(data.tiles_root().is_dir());
        assert!(data.cache_root().is_dir());
        let path = data.write_dalle("a_pal300", 10, 1, &create_solid_raster(4, 4, [1, 2, 3, 4]));
        assert!(path.ends_with("a_pal300/a-1.png"));
        assert!(path.is_file());
    }
}
