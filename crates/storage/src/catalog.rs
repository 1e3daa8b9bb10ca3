//! The in-memory raster catalog and its loader.
//!
//! A [`Catalog`] is built once from the YAML document (or from its binary
//! cache) and never mutated afterwards; the server swaps in a new value on
//! reload.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{CatalogDocument, ChartRecord};
use crate::error::{Result, StorageError};
use crate::geotiff::GeoTiff;
use crate::tiers::{reorder, LABEL_PREFIX, PYRAMID_LAYER};

/// Bumped whenever the serialized layout of [`Catalog`] changes.
const CACHE_FORMAT_VERSION: u32 = 1;

/// What a layer name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Pixels of one catalog layer.
    Raster(String),
    /// Best-fit combination of tier layers.
    Pyramid,
    /// Chart numbers of the given catalog layer.
    Labels(String),
}

/// Indexed, read-only collection of catalog entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Layer name to its drawable entries, in draw order.
    layers: BTreeMap<String, Vec<GeoTiff>>,
    /// Entries with no interior box. Reachable by name, never drawn.
    unplaced: Vec<GeoTiff>,
    #[serde(skip)]
    index: HashMap<String, (Option<String>, usize)>,
}

impl Catalog {
    /// Build a catalog from a parsed document.
    ///
    /// Within each layer, records are sorted by `(zorder, name)`, then the
    /// document's `drawAfter` pairs are applied. Records that fail to
    /// convert are logged and left out.
    pub fn from_document(doc: &CatalogDocument, border_default: u32) -> Self {
        let mut layers = BTreeMap::new();
        let mut unplaced = Vec::new();

        for (layer, records) in &doc.layers {
            let mut sorted: Vec<&ChartRecord> = records.iter().collect();
            sorted.sort_by(|a, b| {
                (a.zorder.unwrap_or(0), &a.name).cmp(&(b.zorder.unwrap_or(0), &b.name))
            });
            let sorted = reorder(sorted, &doc.draw_after, |r| r.name.as_str());

            let mut entries = Vec::with_capacity(sorted.len());
            for record in sorted {
                match GeoTiff::from_record(layer, record, border_default) {
                    Ok(converted) => {
                        for entry in converted {
                            if entry.interior.is_some() {
                                entries.push(entry);
                            } else {
                                debug!(chart = %entry.name, layer = %layer, "Chart has no principal area");
                                unplaced.push(entry);
                            }
                        }
                    }
                    Err(e) => warn!(chart = %record.name, layer = %layer, error = %e, "Skipping catalog entry"),
                }
            }
            layers.insert(layer.clone(), entries);
        }

        let mut catalog = Self {
            layers,
            unplaced,
            index: HashMap::new(),
        };
        catalog.rebuild_index();
        catalog
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (layer, entries) in &self.layers {
            for (i, entry) in entries.iter().enumerate() {
                self.index
                    .entry(entry.name.clone())
                    .or_insert((Some(layer.clone()), i));
            }
        }
        for (i, entry) in self.unplaced.iter().enumerate() {
            self.index.entry(entry.name.clone()).or_insert((None, i));
        }
    }

    /// Entry by name. For charts split at the antimeridian this is the
    /// unshifted copy.
    pub fn get(&self, name: &str) -> Option<&GeoTiff> {
        let (layer, i) = self.index.get(name)?;
        match layer {
            Some(layer) => self.layers.get(layer)?.get(*i),
            None => self.unplaced.get(*i),
        }
    }

    /// Drawable entries of a catalog layer in draw order.
    pub fn layer(&self, name: &str) -> Option<&[GeoTiff]> {
        self.layers.get(name).map(Vec::as_slice)
    }

    /// Catalog layer names (`gt...`).
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Every name a client may request: catalog layers, their label layers
    /// and the pyramid.
    pub fn public_layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.keys().cloned().collect();
        names.push(PYRAMID_LAYER.to_string());
        for layer in self.layers.keys() {
            if let Some(tier) = layer.strip_prefix("gt") {
                names.push(format!("{}{}", LABEL_PREFIX, tier));
            }
        }
        names
    }

    pub fn resolve_layer(&self, name: &str) -> Option<LayerKind> {
        if name == PYRAMID_LAYER {
            return Some(LayerKind::Pyramid);
        }
        if self.layers.contains_key(name) {
            return Some(LayerKind::Raster(name.to_string()));
        }
        let tier = name.strip_prefix(LABEL_PREFIX)?;
        let target = format!("gt{}", tier);
        self.layers
            .contains_key(&target)
            .then_some(LayerKind::Labels(target))
    }

    /// Number of drawable entries (antimeridian twins counted twice).
    pub fn len(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize as gzip-compressed JSON.
    pub fn to_cache_bytes(&self) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        let envelope = CacheEnvelope {
            version: CACHE_FORMAT_VERSION,
            catalog: self,
        };
        serde_json::to_writer(&mut encoder, &envelope)
            .map_err(|e| StorageError::CacheFormat(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| StorageError::CacheFormat(e.to_string()))
    }

    pub fn from_cache_bytes(bytes: &[u8]) -> Result<Self> {
        let mut json = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(|e| StorageError::CacheFormat(e.to_string()))?;
        let envelope: OwnedCacheEnvelope =
            serde_json::from_slice(&json).map_err(|e| StorageError::CacheFormat(e.to_string()))?;
        if envelope.version != CACHE_FORMAT_VERSION {
            return Err(StorageError::CacheFormat(format!(
                "cache format {} (expected {})",
                envelope.version, CACHE_FORMAT_VERSION
            )));
        }
        let mut catalog = envelope.catalog;
        catalog.rebuild_index();
        Ok(catalog)
    }
}

#[derive(Serialize)]
struct CacheEnvelope<'a> {
    version: u32,
    catalog: &'a Catalog,
}

#[derive(Deserialize)]
struct OwnedCacheEnvelope {
    version: u32,
    catalog: Catalog,
}

/// A freshly loaded catalog and whether it came from the document.
#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    /// True when rebuilt from the YAML document rather than the cache.
    pub rebuilt: bool,
}

/// Loads the catalog from the YAML document, going through the binary cache
/// when it is fresh.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    pub document: PathBuf,
    pub cache: PathBuf,
    pub border_default: u32,
}

impl CatalogLoader {
    pub fn new(document: impl Into<PathBuf>, cache: impl Into<PathBuf>, border_default: u32) -> Self {
        Self {
            document: document.into(),
            cache: cache.into(),
            border_default,
        }
    }

    /// Load the catalog.
    ///
    /// The cache is used when it exists, is at least as recent as the
    /// document and is not older than `rebuild_before`. Otherwise the
    /// document is parsed and the cache rewritten. With no document, the
    /// cache is used whatever its age.
    pub fn load(&self, rebuild_before: Option<SystemTime>) -> Result<LoadedCatalog> {
        let doc_mtime = modified(&self.document);
        let cache_mtime = modified(&self.cache);

        let cache_fresh = match (doc_mtime, cache_mtime) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(doc), Some(cache)) => {
                cache >= doc && rebuild_before.map_or(true, |limit| cache >= limit)
            }
        };

        if cache_fresh {
            match self.read_cache() {
                Ok(catalog) => {
                    info!(path = %self.cache.display(), entries = catalog.len(), "Catalog loaded from cache");
                    return Ok(LoadedCatalog {
                        catalog,
                        rebuilt: false,
                    });
                }
                Err(e) => warn!(path = %self.cache.display(), error = %e, "Unreadable catalog cache"),
            }
        }

        if doc_mtime.is_none() {
            return Err(StorageError::CatalogUnavailable(format!(
                "no catalog document at {} and no usable cache at {}",
                self.document.display(),
                self.cache.display()
            )));
        }

        let doc = CatalogDocument::read(&self.document)?;
        let catalog = Catalog::from_document(&doc, self.border_default);
        info!(
            path = %self.document.display(),
            entries = catalog.len(),
            layers = catalog.layers.len(),
            "Catalog rebuilt from document"
        );
        if let Err(e) = self.write_cache(&catalog) {
            warn!(path = %self.cache.display(), error = %e, "Could not write catalog cache");
        }
        Ok(LoadedCatalog {
            catalog,
            rebuilt: true,
        })
    }

    fn read_cache(&self) -> Result<Catalog> {
        let bytes = fs::read(&self.cache).map_err(|e| StorageError::io(&self.cache, e))?;
        Catalog::from_cache_bytes(&bytes)
    }

    fn write_cache(&self, catalog: &Catalog) -> Result<()> {
        let bytes = catalog.to_cache_bytes()?;
        let dir = self
            .cache
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        tmp.write_all(&bytes)
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(&self.cache)
            .map_err(|e| StorageError::io(&self.cache, e.error))?;
        Ok(())
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::SAMPLE_CATALOG;

    fn sample() -> Catalog {
        Catalog::from_document(&CatalogDocument::from_yaml(SAMPLE_CATALOG).unwrap(), 400)
    }

    #[test]
    fn test_draw_after_applied() {
        let catalog = sample();
        let names: Vec<_> = catalog
            .layer("gt50k")
            .unwrap()
            .iter()
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(names, vec!["7002_pal300", "7001_pal300"]);
    }

    #[test]
    fn test_unplaced_reachable_but_not_drawn() {
        let catalog = sample();
        assert!(catalog.get("7003_pal300").is_some());
        assert!(catalog
            .layer("gt50k")
            .unwrap()
            .iter()
            .all(|g| g.name != "7003_pal300"));
    }

    #[test]
    fn test_antimeridian_twins_in_layer() {
        let catalog = sample();
        let layer = catalog.layer("gt1M").unwrap();
        assert_eq!(layer.len(), 2);
        assert!(layer.iter().all(|g| g.name == "6977_pal300"));
        assert_eq!(catalog.get("6977_pal300").unwrap().lon_shift, 0.0);
    }

    #[test]
    fn test_resolve_layer() {
        let catalog = sample();
        assert_eq!(catalog.resolve_layer("gtpyr"), Some(LayerKind::Pyramid));
        assert_eq!(
            catalog.resolve_layer("gt50k"),
            Some(LayerKind::Raster("gt50k".into()))
        );
        assert_eq!(
            catalog.resolve_layer("num50k"),
            Some(LayerKind::Labels("gt50k".into()))
        );
        assert_eq!(catalog.resolve_layer("num25k"), None);
        assert_eq!(catalog.resolve_layer("bogus"), None);
        assert!(catalog.public_layer_names().contains(&"numaem".to_string()));
    }

    #[test]
    fn test_cache_bytes_roundtrip() {
        let catalog = sample();
        let restored = Catalog::from_cache_bytes(&catalog.to_cache_bytes().unwrap()).unwrap();
        assert_eq!(restored.layers, catalog.layers);
        assert_eq!(restored.get("7003_pal300"), catalog.get("7003_pal300"));
    }
}
