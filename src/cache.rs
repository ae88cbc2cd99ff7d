//! Persistent annotation cache
//!
//! Raw annotation payloads keyed by the variant's pseudo-VCF signature
//! (see [`VariantKey::signature`]). The backing file is a single JSON
//! object:
//!
//! ```json
//! {
//!   "17 41244936 . G A . . .": [ { "transcript_consequences": [ ... ] } ]
//! }
//! ```
//!
//! The whole file is loaded once and rewritten after every insertion, so a
//! crash loses at most the request in flight. Each rewrite goes to a
//! temporary file in the same directory that is then renamed over the cache
//! file; readers never observe a partially written cache.
//!
//! # Example
//!
//! ```
//! use ferro_vep::cache::AnnotationCache;
//! use ferro_vep::variant::VariantKey;
//! use serde_json::json;
//!
//! let mut cache = AnnotationCache::new();
//! let key = VariantKey::new("1", 182712, "A", "C");
//! assert!(cache.get(&key).is_none());
//!
//! cache.put(&key, json!([{"variant_class": "SNV"}])).unwrap();
//! assert!(cache.get(&key).is_some());
//! println!("Cache stats: {:?}", cache.stats());
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::VepError;
use crate::variant::VariantKey;

/// Statistics for cache usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries added this run
    pub inserts: u64,
    /// Number of entries currently in cache
    pub size: usize,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Signature-keyed payload store mirrored to a JSON file
#[derive(Debug, Default)]
pub struct AnnotationCache {
    entries: BTreeMap<String, Value>,
    path: Option<PathBuf>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

impl AnnotationCache {
    /// Create an in-memory cache with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache mirrored at `path`.
    ///
    /// A missing file is an empty cache; the file is created on the first
    /// [`put`](Self::put). A file that exists but is not a JSON object is
    /// an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VepError> {
        let path = path.as_ref();
        let entries = if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let value: Value = serde_json::from_reader(reader).map_err(|e| VepError::Json {
                msg: format!("Failed to parse cache {}: {}", path.display(), e),
            })?;
            match value {
                Value::Object(map) => map.into_iter().collect(),
                other => {
                    return Err(VepError::Json {
                        msg: format!(
                            "Cache {} must hold a JSON object, found {}",
                            path.display(),
                            json_kind(&other)
                        ),
                    })
                }
            }
        } else {
            debug!("No cache at {}, starting empty", path.display());
            BTreeMap::new()
        };

        info!("Loaded {} cached annotations from {}", entries.len(), path.display());
        Ok(Self {
            entries,
            path: Some(path.to_path_buf()),
            ..Self::default()
        })
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Cached payload for `key`.
    pub fn get(&self, key: &VariantKey) -> Option<&Value> {
        self.get_signature(&key.signature())
    }

    /// Cached payload for a raw signature string.
    pub fn get_signature(&self, signature: &str) -> Option<&Value> {
        let found = self.entries.get(signature);
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Whether `key` is cached, without touching the hit counters.
    pub fn contains(&self, key: &VariantKey) -> bool {
        self.entries.contains_key(&key.signature())
    }

    /// Insert or overwrite the payload for `key`.
    ///
    /// With a backing file, the whole cache is rewritten before returning.
    pub fn put(&mut self, key: &VariantKey, payload: Value) -> Result<(), VepError> {
        self.entries.insert(key.signature(), payload);
        self.inserts.fetch_add(1, Ordering::Relaxed);

        if let Some(path) = &self.path {
            self.flush(path)?;
        }
        Ok(())
    }

    /// Write the full cache to `path`, replacing it atomically.
    pub fn flush<P: AsRef<Path>>(&self, path: P) -> Result<(), VepError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.entries)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| VepError::Io {
            msg: format!("Failed to replace cache {}: {}", path.display(), e),
        })?;

        debug!("Wrote {} cache entries to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Number of cached variants
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signatures and payloads in signature order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
