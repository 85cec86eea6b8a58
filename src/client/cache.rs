//! Disk-backed result memoization
//!
//! Call results are persisted as one JSON file per key so a re-run on the
//! same day reads the answer from disk instead of the API. Keys combine the
//! client file prefix, an optional per-chunk suffix, the operation prefix
//! and a date, so each calendar day gets its own entry and invalidation is
//! a plain file deletion.
//!
//! Read failures (missing or corrupt entries) are never fatal: the producer
//! runs and its result replaces the entry.

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::chunking::ChunkTracker;
use super::{ClientError, ClientResult};

/// Injected key-value store collaborator holding cached call results.
pub trait CacheStore: Send + Sync {
    /// Look up an entry; any read failure is reported as a miss.
    fn get(&self, key: &str) -> Option<Value>;

    /// Persist an entry under the key, replacing any previous value.
    fn put(&self, key: &str, value: &Value) -> ClientResult<()>;
}

/// File-per-key cache store writing pretty JSON under a directory.
pub struct FileCacheStore {
    directory: PathBuf,
}

impl FileCacheStore {
    /// Build a store rooted at `directory` (created on first write).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cache entry unreadable, getting fresh");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cache entry corrupt, getting fresh");
                None
            }
        }
    }

    fn put(&self, key: &str, value: &Value) -> ClientResult<()> {
        std::fs::create_dir_all(&self.directory)
            .map_err(|e| ClientError::Cache(format!("creating cache dir: {e}")))?;
        let path = self.path_for(key);
        let body = serde_json::to_string_pretty(value)
            .map_err(|e| ClientError::Cache(format!("encoding cache entry: {e}")))?;
        std::fs::write(&path, body)
            .map_err(|e| ClientError::Cache(format!("writing {}: {e}", path.display())))?;
        debug!(path = %path.display(), "cache entry written");
        Ok(())
    }
}

/// Memoizes producer output in a [`CacheStore`].
///
/// When a chunk tracker is attached and the produced value is an array, only
/// the trailing slice of the most recent chunk's length is persisted, and the
/// key carries a `_p{n}` part suffix. No locking guards the read-then-write
/// sequence; the store assumes a single process.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    prefix: String,
    enabled: bool,
    reference_date: Option<NaiveDate>,
    tracker: Option<Arc<Mutex<ChunkTracker>>>,
}

impl ResultCache {
    /// Build a cache over an injected store.
    pub fn new(store: Box<dyn CacheStore>, prefix: impl Into<String>, enabled: bool) -> Self {
        Self {
            store: Arc::from(store),
            prefix: prefix.into(),
            enabled,
            reference_date: None,
            tracker: None,
        }
    }

    /// Pin cache keys to a fixed reference date instead of today.
    pub fn with_reference_date(mut self, date: Option<NaiveDate>) -> Self {
        self.reference_date = date;
        self
    }

    /// Attach the chunk tracking context shared with a [`super::Chunker`].
    pub fn with_tracker(mut self, tracker: Arc<Mutex<ChunkTracker>>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Toggle memoization.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether memoization is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The cache key for an operation prefix under the current date and
    /// chunk context.
    pub fn key(&self, op_prefix: &str) -> String {
        let date = self
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let file_prefix = match &self.tracker {
            Some(tracker) => match tracker.lock() {
                Ok(t) => format!("{}_p{}", self.prefix, t.part_num),
                Err(_) => self.prefix.clone(),
            },
            None => self.prefix.clone(),
        };
        format!("{file_prefix}_{op_prefix}_{date}")
    }

    /// Return the stored value for `op_prefix`, or invoke `producer` and
    /// persist its result.
    ///
    /// The enabled flag gates only the lookup: with caching disabled the
    /// producer always runs, but its result is still written through, so a
    /// later enabled call sees the freshest value. Store write failures are
    /// surfaced; read failures fall through to the producer.
    pub async fn memoize<F, Fut>(&self, op_prefix: &str, producer: F) -> ClientResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<Value>>,
    {
        let key = self.key(op_prefix);
        if self.enabled {
            if let Some(value) = self.store.get(&key) {
                debug!(%key, "cache hit");
                return Ok(value);
            }
            debug!(%key, "cache miss, calling producer");
        } else {
            debug!(%key, "cache disabled, calling producer");
        }
        let value = producer().await?;
        let persisted = self.slice_for_persist(&value);
        if let Err(err) = self.store.put(&key, &persisted) {
            warn!(%key, error = %err, "failed to persist cache entry");
            return Err(err);
        }
        Ok(value)
    }

    /// For chunked calls, keep only the most recent chunk's slice of an
    /// array result; everything else persists in full.
    fn slice_for_persist(&self, value: &Value) -> Value {
        let Some(tracker) = &self.tracker else {
            return value.clone();
        };
        let Ok(t) = tracker.lock() else {
            return value.clone();
        };
        match value.as_array() {
            Some(items) if t.last_len <= items.len() => {
                Value::Array(items[items.len() - t.last_len..].to_vec())
            }
            _ => value.clone(),
        }
    }
}
