//! Parsed-table cache
//!
//! Tables are keyed by a SHA-256 of the workbook bytes plus the sheet and
//! header options, so an unchanged file is never parsed twice. The cache can
//! be persisted next to the workbooks it describes.

use crate::error::Result;
use crate::table::{load_table, LoadOptions, Table};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CACHE_FILE_NAME: &str = ".docrecon-cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCache {
    /// Bumped whenever the cached table layout changes
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// File the table came from, for humans reading the cache file
    pub source: String,
    pub sheet: String,
    pub table: Table,
}

impl Default for TableCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

impl TableCache {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// Load the cache stored in `folder`. A missing, unreadable or outdated
    /// file yields an empty cache.
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(e) => {
                warn!("cannot open cache {}: {}", cache_path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_reader::<_, TableCache>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => {
                debug!("loaded {} cached tables", cache.len());
                cache
            }
            Ok(cache) => {
                warn!(
                    "cache version {} does not match {}, starting empty",
                    cache.version,
                    Self::CURRENT_VERSION
                );
                Self::default()
            }
            Err(e) => {
                warn!("corrupt cache {}: {}", cache_path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Delete the persisted cache file. Returns whether one existed.
    pub fn remove_file(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(cache_path)?;
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<&Table> {
        self.entries.get(key).map(|e| &e.table)
    }

    pub fn insert(&mut self, key: String, source: String, table: Table) {
        let sheet = table.sheet.clone();
        self.entries.insert(key, CacheEntry { source, sheet, table });
    }

    /// Cached table for `key`, or the result of `load` (which is then cached).
    pub fn get_or_load<F>(&mut self, key: &str, source: &str, load: F) -> Result<Table>
    where
        F: FnOnce() -> Result<Table>,
    {
        if let Some(table) = self.get(key) {
            debug!("cache hit for {} [{}]", source, table.sheet);
            return Ok(table.clone());
        }
        let table = load()?;
        self.insert(key.to_string(), source.to_string(), table.clone());
        Ok(table)
    }

    /// Parse a sheet through the cache.
    pub fn load_table(&mut self, source: &str, bytes: &[u8], sheet: &str, options: &LoadOptions) -> Result<Table> {
        let key = fingerprint(bytes, sheet, options);
        self.get_or_load(&key, source, || load_table(bytes, sheet, options))
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for one sheet of one workbook, read with the given options.
pub fn fingerprint(bytes: &[u8], sheet: &str, options: &LoadOptions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.update([0u8]);
    hasher.update(sheet.as_bytes());
    hasher.update([0u8]);
    hasher.update(options.tag().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_depends_on_every_input() {
        let opts = LoadOptions::row(0);
        let base = fingerprint(b"abc", "RH", &opts);
        assert_eq!(base.len(), 64);
        assert_eq!(base, fingerprint(b"abc", "RH", &opts));
        assert_ne!(base, fingerprint(b"abd", "RH", &opts));
        assert_ne!(base, fingerprint(b"abc", "ST", &opts));
        assert_ne!(base, fingerprint(b"abc", "RH", &LoadOptions::row(1)));
    }

    #[test]
    fn test_get_or_load_calls_loader_once() {
        let mut cache = TableCache::default();
        let mut calls = 0;
        for _ in 0..2 {
            let table = cache
                .get_or_load("k", "book.xlsx", || {
                    calls += 1;
                    Ok(Table::new("RH", vec!["A".into()], vec![]))
                })
                .unwrap();
            assert_eq!(table.sheet, "RH");
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = TableCache::default();
        cache.insert("a".into(), "x.xlsx".into(), Table::default());
        cache.insert("b".into(), "y.xlsx".into(), Table::default());
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
