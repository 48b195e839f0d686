//! Remote content cache
//!
//! Key to bytes store with a TTL per entry. Concurrent callers asking for the
//! same missing key share one computation. Entries live in memory and, when
//! the cache has a directory, in one JSON file per key so they outlive the
//! process.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::core::cachehash;
use crate::infra::filesystem;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: SystemTime,
}

impl Entry {
    fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

/// On-disk form of an entry
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    expires_at: SystemTime,
    /// Hex-encoded content
    value: String,
}

/// TTL cache with single-flight computation per key
#[derive(Debug, Default)]
pub struct ContentCache {
    entries: Mutex<HashMap<String, Entry>>,
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    dir: Option<PathBuf>,
}

impl ContentCache {
    /// In-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that also persists entries under `dir`
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Persistence directory, if any
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Fresh value for `key`, or the result of `compute`.
    ///
    /// `compute` returns the value together with how long it stays fresh. At
    /// most one `compute` runs per key at a time; callers arriving meanwhile
    /// wait and receive the stored result. Errors are returned to the caller
    /// that computed and are not cached.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, compute: F) -> Result<Vec<u8>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(Vec<u8>, Duration), E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let gate = self.gate(key);
        let result = {
            let _guard = gate.lock().await;
            match self.get(key) {
                Some(value) => Ok(value),
                None => match compute().await {
                    Ok((value, ttl)) => {
                        self.set(key, value.clone(), ttl);
                        Ok(value)
                    }
                    Err(e) => Err(e),
                },
            }
        };
        self.release_gate(key, &gate);
        result
    }

    /// Fresh value for `key`
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = lock(&self.entries);
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired() {
                tracing::debug!("Cache hit for {key}");
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }

        let entry = self.read_entry(key)?;
        tracing::debug!("Loaded {key} from disk cache");
        let value = entry.value.clone();
        entries.insert(key.to_string(), entry);
        Some(value)
    }

    /// Store `value` under `key` for `ttl`
    pub fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .unwrap_or_else(far_future);
        let entry = Entry { value, expires_at };
        self.write_entry(key, &entry);
        lock(&self.entries).insert(key.to_string(), entry);
    }

    /// Drop every entry
    pub fn clear(&self) {
        lock(&self.entries).clear();
        if let Some(dir) = &self.dir {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => tracing::debug!("Cleared cache directory {}", dir.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to clear cache {}: {e}", dir.display()),
            }
        }
    }

    fn gate(&self, key: &str) -> Arc<AsyncMutex<()>> {
        lock(&self.gates)
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn release_gate(&self, key: &str, gate: &Arc<AsyncMutex<()>>) {
        let mut gates = lock(&self.gates);
        // The map and this caller hold the only references when nobody waits.
        let idle = gates
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, gate) && Arc::strong_count(gate) <= 2);
        if idle {
            gates.remove(key);
        }
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", cachehash::bytes(key.as_bytes()))))
    }

    fn read_entry(&self, key: &str) -> Option<Entry> {
        let path = self.entry_path(key)?;
        let content = match filesystem::read_if_exists(&path) {
            Ok(content) => content?,
            Err(e) => {
                tracing::warn!("Failed to read cache entry {}: {e}", path.display());
                return None;
            }
        };
        let stored: StoredEntry = match serde_json::from_slice(&content) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache entry {}: {e}", path.display());
                return None;
            }
        };
        if stored.key != key {
            return None;
        }
        let value = hex::decode(&stored.value).ok()?;
        let entry = Entry {
            value,
            expires_at: stored.expires_at,
        };
        if entry.is_expired() {
            tracing::debug!("Disk cache entry for {key} expired");
            let _ = std::fs::remove_file(&path);
            return None;
        }
        Some(entry)
    }

    fn write_entry(&self, key: &str, entry: &Entry) {
        let Some(path) = self.entry_path(key) else {
            return;
        };
        let stored = StoredEntry {
            key: key.to_string(),
            expires_at: entry.expires_at,
            value: hex::encode(&entry.value),
        };
        let result = serde_json::to_vec(&stored)
            .map_err(std::io::Error::from)
            .and_then(|content| filesystem::write_atomic(&path, &content));
        if let Err(e) = result {
            tracing::warn!("Failed to write cache entry {}: {e}", path.display());
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn far_future() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(u64::from(u32::MAX) * 64)
}
