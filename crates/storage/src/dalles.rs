//! On-disk dalles: the fixed-size fragments sliced from each source raster.
//!
//! Layout: `{root}/{gtname}/{col:x}-{row:x}.png`, column and row in lowercase
//! hexadecimal. Decoded dalles are kept in a byte-bounded LRU.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use lru::LruCache;
use tracing::{debug, warn};

use crate::error::{Result, StorageError};

/// Edge length of a dalle in pixels.
pub const DALLE_SIZE: u32 = 1024;

/// File name of the dalle at grid position `(col, row)`.
pub fn dalle_file_name(col: u32, row: u32) -> String {
    format!("{:x}-{:x}.png", col, row)
}

/// Parse a dalle file name back into `(col, row)`.
pub fn parse_dalle_file_name(name: &str) -> Option<(u32, u32)> {
    let stem = name.strip_suffix(".png")?;
    let (col, row) = stem.split_once('-')?;
    Some((
        u32::from_str_radix(col, 16).ok()?,
        u32::from_str_radix(row, 16).ok()?,
    ))
}

/// Read access to dalles. `Ok(None)` means the dalle does not exist and the
/// area is transparent.
pub trait DalleSource: Send + Sync {
    fn dalle(&self, gtname: &str, col: u32, row: u32) -> Result<Option<Arc<RgbaImage>>>;
}

type DalleKey = (String, u32, u32);

struct LruState {
    entries: LruCache<DalleKey, Arc<RgbaImage>>,
    bytes: usize,
}

/// Dalles read from a directory tree.
pub struct FsDalleStore {
    root: PathBuf,
    max_bytes: usize,
    state: Mutex<LruState>,
    missing_logged: Mutex<HashSet<String>>,
}

impl FsDalleStore {
    /// Create a store over `root` keeping at most `max_size_mb` of decoded pixels.
    pub fn new(root: impl Into<PathBuf>, max_size_mb: usize) -> Self {
        // eviction is by bytes; the entry bound only has to be out of the way
        const LRU_CAPACITY: usize = 1_000_000;
        let capacity = NonZeroUsize::new(LRU_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            root: root.into(),
            max_bytes: max_size_mb * 1024 * 1024,
            state: Mutex::new(LruState {
                entries: LruCache::new(capacity),
                bytes: 0,
            }),
            missing_logged: Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, gtname: &str, col: u32, row: u32) -> PathBuf {
        self.root.join(gtname).join(dalle_file_name(col, row))
    }

    /// Drop every decoded dalle.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.clear();
        state.bytes = 0;
    }

    /// Decoded bytes currently held.
    pub fn cached_bytes(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).bytes
    }

    fn insert(&self, key: DalleKey, img: Arc<RgbaImage>) {
        let size = img.as_raw().len();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while state.bytes + size > self.max_bytes {
            match state.entries.pop_lru() {
                Some((_, evicted)) => state.bytes -= evicted.as_raw().len(),
                None => break,
            }
        }
        if size <= self.max_bytes {
            if let Some(old) = state.entries.put(key, img) {
                state.bytes -= old.as_raw().len();
            }
            state.bytes += size;
        }
    }
}

impl DalleSource for FsDalleStore {
    fn dalle(&self, gtname: &str, col: u32, row: u32) -> Result<Option<Arc<RgbaImage>>> {
        let key = (gtname.to_string(), col, row);
        if let Some(hit) = self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .get(&key)
        {
            return Ok(Some(hit.clone()));
        }

        let path = self.path_of(gtname, col, row);
        if !path.is_file() {
            let mut logged = self.missing_logged.lock().unwrap_or_else(|e| e.into_inner());
            if logged.insert(gtname.to_string()) {
                warn!(chart = %gtname, path = %path.display(), "Missing dalle, drawing transparent");
            }
            return Ok(None);
        }

        let img = image::open(&path)
            .map_err(|e| StorageError::Image {
                path: path.clone(),
                message: e.to_string(),
            })?
            .into_rgba8();
        debug!(path = %path.display(), width = img.width(), height = img.height(), "Dalle decoded");

        let img = Arc::new(img);
        self.insert(key, img.clone());
        Ok(Some(img))
    }
}

/// Dalles held in memory, for tests and tooling.
#[derive(Default)]
pub struct MemoryDalleStore {
    dalles: HashMap<DalleKey, Arc<RgbaImage>>,
}

impl MemoryDalleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, gtname: &str, col: u32, row: u32, img: RgbaImage) {
        self.dalles
            .insert((gtname.to_string(), col, row), Arc::new(img));
    }

    /// Cut `img` into dalles exactly as the ingestion pipeline does.
    pub fn insert_raster(&mut self, gtname: &str, img: &RgbaImage) {
        let cols = img.width().div_ceil(DALLE_SIZE);
        let rows = img.height().div_ceil(DALLE_SIZE);
        for row in 0..rows {
            for col in 0..cols {
                let x = col * DALLE_SIZE;
                let y = row * DALLE_SIZE;
                let w = DALLE_SIZE.min(img.width() - x);
                let h = DALLE_SIZE.min(img.height() - y);
                let dalle = image::imageops::crop_imm(img, x, y, w, h).to_image();
                self.insert(gtname, col, row, dalle);
            }
        }
    }
}

impl DalleSource for MemoryDalleStore {
    fn dalle(&self, gtname: &str, col: u32, row: u32) -> Result<Option<Arc<RgbaImage>>> {
        Ok(self.dalles.get(&(gtname.to_string(), col, row)).cloned())
    }
}
