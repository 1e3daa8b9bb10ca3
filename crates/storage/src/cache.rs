//! Disk cache for rendered output tiles.
//!
//! Files live at `{root}/{layer}/{z}/{x}/{y}.png`. Only keys accepted by the
//! [`CachePolicy`] are ever read or written, and a bypass request skips the
//! cache on both paths.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use bytes::Bytes;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use wms_common::TileCoord;

use crate::error::{Result, StorageError};

/// Cache key for one output tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub layer: String,
    pub coord: TileCoord,
}

impl CacheKey {
    pub fn new(layer: impl Into<String>, coord: TileCoord) -> Self {
        Self {
            layer: layer.into(),
            coord,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layer, self.coord.cache_key())
    }
}

/// Whether a request may use the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Normal,
    /// Debug requests: neither read nor write.
    Bypass,
}

/// Which keys are worth keeping on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    pub layers: HashSet<String>,
    pub max_zoom: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            layers: HashSet::from([crate::tiers::PYRAMID_LAYER.to_string()]),
            max_zoom: 12,
        }
    }
}

impl CachePolicy {
    pub fn is_eligible(&self, key: &CacheKey) -> bool {
        key.coord.z <= self.max_zoom && self.layers.contains(&key.layer)
    }
}

/// Write-through disk cache of output tiles.
#[derive(Debug, Clone)]
pub struct TileCache {
    root: PathBuf,
    policy: CachePolicy,
}

impl TileCache {
    pub fn new(root: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn path_of(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(&key.layer)
            .join(key.coord.z.to_string())
            .join(key.coord.x.to_string())
            .join(format!("{}.png", key.coord.y))
    }

    fn usable(&self, key: &CacheKey, mode: CacheMode) -> bool {
        mode == CacheMode::Normal && self.policy.is_eligible(key)
    }

    /// Cached bytes for `key`, if any. Read failures count as a miss.
    pub fn try_read(&self, key: &CacheKey, mode: CacheMode) -> Option<Bytes> {
        if !self.usable(key, mode) {
            return None;
        }
        let path = self.path_of(key);
        match fs::read(&path) {
            Ok(data) => {
                debug!(key = %key, bytes = data.len(), "Tile cache hit");
                Some(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Tile cache read failed");
                None
            }
        }
    }

    /// Store `data` for `key`. Returns whether anything was written.
    ///
    /// Writes go through a temporary file renamed into place, so readers see
    /// either the old tile or the new one. Concurrent writers of the same key
    /// simply race; the last rename wins.
    pub fn write(&self, key: &CacheKey, data: &[u8], mode: CacheMode) -> Result<bool> {
        if !self.usable(key, mode) {
            return Ok(false);
        }
        let path = self.path_of(key);
        let dir = path
            .parent()
            .ok_or_else(|| StorageError::io(&path, std::io::ErrorKind::InvalidInput.into()))?;
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        tmp.write_all(data)
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StorageError::io(&path, e.error))?;
        debug!(key = %key, bytes = data.len(), "Tile cached");
        Ok(true)
    }

    /// Delete every cached tile. Returns the number of files removed.
    pub fn clear(&self) -> Result<u64> {
        if !self.root.exists() {
            return Ok(0);
        }
        let files = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count() as u64;

        for entry in fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))? {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| StorageError::io(&path, e))?;
        }
        info!(root = %self.root.display(), files, "Tile cache cleared");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (tempfile::TempDir, TileCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = TileCache::new(dir.path(), CachePolicy::default());
        (dir, cache)
    }

    #[test]
    fn test_eligible_write_then_read() {
        let (_dir, cache) = cache();
        let key = CacheKey::new("gtpyr", TileCoord::new(5, 15, 11));
        assert!(cache.try_read(&key, CacheMode::Normal).is_none());
        assert!(cache.write(&key, b"png bytes", CacheMode::Normal).unwrap());
        assert_eq!(
            cache.try_read(&key, CacheMode::Normal).unwrap().as_ref(),
            b"png bytes"
        );
        assert!(cache.path_of(&key).ends_with("gtpyr/5/15/11.png"));
    }

    #[test]
    fn test_ineligible_never_touches_disk() {
        let (_dir, cache) = cache();
        for key in [
            CacheKey::new("gt50k", TileCoord::new(5, 15, 11)),
            CacheKey::new("gtpyr", TileCoord::new(13, 4000, 2800)),
        ] {
            assert!(!cache.write(&key, b"x", CacheMode::Normal).unwrap());
            assert!(!cache.path_of(&key).exists());
            assert!(cache.try_read(&key, CacheMode::Normal).is_none());
        }
    }

    #[test]
    fn test_bypass_skips_both_paths() {
        let (_dir, cache) = cache();
        let key = CacheKey::new("gtpyr", TileCoord::new(3, 1, 2));
        assert!(!cache.write(&key, b"debug", CacheMode::Bypass).unwrap());
        assert!(cache.try_read(&key, CacheMode::Normal).is_none());

        cache.write(&key, b"real", CacheMode::Normal).unwrap();
        assert!(cache.try_read(&key, CacheMode::Bypass).is_none());
    }

    #[test]
    fn test_overwrite_last_writer_wins() {
        let (_dir, cache) = cache();
        let key = CacheKey::new("gtpyr", TileCoord::new(1, 0, 0));
        cache.write(&key, b"first", CacheMode::Normal).unwrap();
        cache.write(&key, b"second", CacheMode::Normal).unwrap();
        assert_eq!(
            cache.try_read(&key, CacheMode::Normal).unwrap().as_ref(),
            b"second"
        );
    }

    #[test]
    fn test_clear() {
        let (_dir, cache) = cache();
        for x in 0..3 {
            let key = CacheKey::new("gtpyr", TileCoord::new(2, x, 0));
            cache.write(&key, b"t", CacheMode::Normal).unwrap();
        }
        assert_eq!(cache.clear().unwrap(), 3);
        let key = CacheKey::new("gtpyr", TileCoord::new(2, 0, 0));
        assert!(cache.try_read(&key, CacheMode::Normal).is_none());
    }
}
