use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Length of the hex key hash used for file names
const KEY_HASH_LEN: usize = 32;
const KEY_PREVIEW_CHARS: usize = 50;

/// A single cached value as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    /// `None` means the entry never expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hit_count: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Aggregate numbers about the cache directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub valid_entries: usize,
    pub total_size_bytes: u64,
    pub total_size_human: String,
    pub cache_dir: String,
}

/// Disk-backed key/value cache with TTL expiration.
///
/// Entries live at `<dir>/<hash[..2]>/<hash>.json`. Every I/O or parse failure
/// is logged and treated as a miss (reads) or a no-op (writes); the cache never
/// surfaces errors to callers.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    default_ttl: Duration,
    enabled: bool,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, default_ttl: Duration, enabled: bool) -> Self {
        let dir = dir.into();

        if enabled {
            match std::fs::create_dir_all(&dir) {
                Ok(()) => debug!(dir = %dir.display(), "cache initialized"),
                Err(e) => warn!(dir = %dir.display(), error = %e, "failed to create cache directory"),
            }
        }

        Self {
            dir,
            default_ttl,
            enabled,
        }
    }

    /// A cache that stores nothing and always misses
    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), Duration::ZERO, false)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fixed-length hex hash of a key
    pub fn key_hash(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let mut hash = hex::encode(hasher.finalize());
        hash.truncate(KEY_HASH_LEN);
        hash
    }

    /// Sharded file path for a key
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let hash = Self::key_hash(key);
        self.dir.join(&hash[..2]).join(format!("{}.json", hash))
    }

    /// Store a value. `ttl` of `None` uses the default; a zero TTL never expires.
    pub fn set(&self, key: &str, value: impl Serialize, ttl: Option<Duration>) -> bool {
        if !self.enabled {
            return false;
        }

        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %preview(key), error = %e, "cache value is not serializable");
                return false;
            }
        };

        let now = Utc::now();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at = if ttl.is_zero() {
            None
        } else {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
        };

        let entry = CacheEntry {
            key: key.to_string(),
            value,
            created_at: now,
            expires_at,
            hit_count: 0,
        };

        let path = self.entry_path(key);
        match write_entry(&path, &entry) {
            Ok(()) => {
                debug!(key = %preview(key), "cache set");
                true
            }
            Err(e) => {
                warn!(key = %preview(key), error = %e, "failed to write cache entry");
                false
            }
        }
    }

    /// Fetch a value, counting the hit. Expired entries are deleted and miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.get_entry(key)?;
        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %preview(key), error = %e, "cached value has unexpected shape");
                None
            }
        }
    }

    /// Fetch the full entry (after incrementing its hit count)
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }

        let path = self.entry_path(key);
        let mut entry = read_entry(&path)?;

        if entry.is_expired(Utc::now()) {
            self.delete(key);
            return None;
        }

        entry.hit_count += 1;
        if let Err(e) = write_entry(&path, &entry) {
            warn!(key = %preview(key), error = %e, "failed to persist cache hit count");
        }

        debug!(key = %preview(key), hits = entry.hit_count, "cache hit");
        Some(entry)
    }

    /// Remove an entry. Returns true only when a file was actually removed.
    pub fn delete(&self, key: &str) -> bool {
        if !self.enabled {
            return false;
        }

        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = %preview(key), "cache deleted");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(key = %preview(key), error = %e, "failed to delete cache entry");
                false
            }
        }
    }

    /// Whether a live entry exists; expired entries are purged
    pub fn exists(&self, key: &str) -> bool {
        if !self.enabled {
            return false;
        }

        let Some(entry) = read_entry(&self.entry_path(key)) else {
            return false;
        };

        if entry.is_expired(Utc::now()) {
            self.delete(key);
            return false;
        }
        true
    }

    /// Remove every entry. Returns the number of files removed.
    pub fn clear(&self) -> usize {
        let mut count = 0;
        for path in self.entry_files() {
            if std::fs::remove_file(&path).is_ok() {
                count += 1;
            }
        }
        info!(count, "cache cleared");
        count
    }

    /// Remove only expired entries. Returns the number removed.
    pub fn clear_expired(&self) -> usize {
        let now = Utc::now();
        let mut count = 0;
        for path in self.entry_files() {
            let expired = read_entry(&path).is_some_and(|entry| entry.is_expired(now));
            if expired && std::fs::remove_file(&path).is_ok() {
                count += 1;
            }
        }
        info!(count, "expired cache entries removed");
        count
    }

    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let mut total_entries = 0;
        let mut expired_entries = 0;
        let mut total_size_bytes = 0;

        for path in self.entry_files() {
            total_entries += 1;
            total_size_bytes += std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            if read_entry(&path).is_some_and(|entry| entry.is_expired(now)) {
                expired_entries += 1;
            }
        }

        CacheStats {
            total_entries,
            expired_entries,
            valid_entries: total_entries - expired_entries,
            total_size_bytes,
            total_size_human: human_readable_size(total_size_bytes),
            cache_dir: self.dir.display().to_string(),
        }
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        if !self.dir.is_dir() {
            return Vec::new();
        }

        WalkDir::new(&self.dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }
}

fn read_entry(path: &Path) -> Option<CacheEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read cache entry");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt cache entry");
            None
        }
    }
}

fn write_entry(path: &Path, entry: &CacheEntry) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(entry).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

fn preview(key: &str) -> String {
    key.chars().take(KEY_PREVIEW_CHARS).collect()
}

pub(crate) fn human_readable_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} TB", size)
}
