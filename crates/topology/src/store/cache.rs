//! Best-effort persisted node cache.
//!
//! One record `{nodes, timestamp}` lives under a fixed key. Reads are permissive
//! (anything unusable reads as "no cache") and writes are fire-and-forget: a cache
//! failure never reaches the store's state or its advisory.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use api_types::CacheEntry;
use api_types::StatusNode;
use chrono::Utc;
use error_stack::Report;
use error_stack::ResultExt;
use serde_json::Value;
use tracing::debug;

use crate::error::CacheError;

pub type CacheResult<T> = Result<T, Report<CacheError>>;

/// Raw key/value storage the cache record is kept in.
pub trait CacheBackend: Send + Sync {
    /// Read the raw record, `None` if nothing is stored under `key`.
    fn read(&self, key: &str) -> CacheResult<Option<String>>;

    fn write(&self, key: &str, value: &str) -> CacheResult<()>;
}

impl<T: CacheBackend + ?Sized> CacheBackend for Arc<T> {
    fn read(&self, key: &str) -> CacheResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        (**self).write(key, value)
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CacheBackend for FileCache {
    fn read(&self, key: &str) -> CacheResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Report::new(CacheError::Io {
                message: e.to_string(),
            })
            .attach_printable(format!("path: {}", path.display()))),
        }
    }

    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        fs::create_dir_all(&self.dir).change_context(CacheError::Io {
            message: "Failed to create cache directory".into(),
        })?;
        let path = self.path_for(key);
        // write-then-rename so a crash never leaves a torn record behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).change_context(CacheError::Io {
            message: "Failed to write cache record".into(),
        })?;
        fs::rename(&tmp, &path).change_context(CacheError::Io {
            message: "Failed to replace cache record".into(),
        })
    }
}

/// Process-lifetime storage, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value as-is, bypassing serialization.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.into(), value.into());
        }
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl CacheBackend for MemoryCache {
    fn read(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| {
            Report::new(CacheError::Io {
                message: "memory cache lock poisoned".into(),
            })
        })?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut entries = self.entries.lock().map_err(|_| {
            Report::new(CacheError::Io {
                message: "memory cache lock poisoned".into(),
            })
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The node cache record under a fixed key.
pub struct NodeCache {
    backend: Box<dyn CacheBackend>,
    key: String,
}

impl NodeCache {
    pub fn new(backend: impl CacheBackend + 'static, key: impl Into<String>) -> Self {
        Self {
            backend: Box::new(backend),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Cached nodes, or `None` when the record is absent, unreadable or empty.
    pub fn load(&self) -> Option<Vec<StatusNode>> {
        match self.try_load() {
            Ok(nodes) => nodes.filter(|nodes| !nodes.is_empty()),
            Err(e) => {
                debug!(key = %self.key, "cache read failed: {e:?}");
                None
            }
        }
    }

    /// Persist `nodes`, swallowing any failure.
    pub fn save(&self, nodes: &[StatusNode]) {
        if let Err(e) = self.try_save(nodes) {
            debug!(key = %self.key, "cache write failed: {e:?}");
        }
    }

    fn try_load(&self) -> CacheResult<Option<Vec<StatusNode>>> {
        let Some(raw) = self.backend.read(&self.key)? else {
            return Ok(None);
        };
        let mut record: Value =
            serde_json::from_str(&raw).change_context(CacheError::Serialization {
                message: "cache record is not JSON".into(),
            })?;
        // only `nodes` matters; a missing or odd timestamp is tolerated
        let Some(nodes) = record.get_mut("nodes").map(Value::take) else {
            return Ok(None);
        };
        let nodes = serde_json::from_value(nodes).change_context(CacheError::Serialization {
            message: "cached nodes have an unexpected shape".into(),
        })?;
        Ok(Some(nodes))
    }

    fn try_save(&self, nodes: &[StatusNode]) -> CacheResult<()> {
        let entry = CacheEntry {
            nodes: nodes.to_vec(),
            timestamp: Utc::now(),
        };
        let raw = serde_json::to_string(&entry).change_context(CacheError::Serialization {
            message: "Failed to serialize cache record".into(),
        })?;
        self.backend.write(&self.key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use api_types::StatusRole;
    use similar_asserts::assert_eq;

    use super::*;

    fn sample_nodes() -> Vec<StatusNode> {
        vec![
            StatusNode::new("minibeast", StatusRole::Gateway, true),
            StatusNode::new("hermes", StatusRole::Storage, false),
            StatusNode::new("hades", StatusRole::Gpu, true),
        ]
    }

    struct BrokenBackend;

    impl CacheBackend for BrokenBackend {
        fn read(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(Report::new(CacheError::Io {
                message: "denied".into(),
            }))
        }

        fn write(&self, _key: &str, _value: &str) -> CacheResult<()> {
            Err(Report::new(CacheError::Io {
                message: "quota exceeded".into(),
            }))
        }
    }

    #[test]
    fn file_cache_reload_preserves_order_and_fields() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let cache = NodeCache::new(FileCache::new(dir.path().join("nested")), "topology");

        cache.save(&sample_nodes());

        let reopened = NodeCache::new(FileCache::new(dir.path().join("nested")), "topology");
        assert_eq!(reopened.load(), Some(sample_nodes()));
    }

    #[test]
    fn record_carries_millisecond_timestamp() {
        let cache = NodeCache::new(MemoryCache::new(), "k");
        cache.save(&sample_nodes());
        let raw = cache.backend.read("k").expect("should read").expect("record");

        let value: Value = serde_json::from_str(&raw).expect("should parse record");
        assert!(value["timestamp"].is_i64());
        assert_eq!(value["nodes"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn missing_record_reads_as_none() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let cache = NodeCache::new(FileCache::new(dir.path()), "absent");
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn malformed_records_read_as_none() {
        for raw in [
            "not json",
            "{}",
            r#"{"nodes": "nope"}"#,
            r#"{"nodes": [{"name": 1}]}"#,
            r#"{"nodes": [], "timestamp": 1}"#,
        ] {
            let backend = MemoryCache::new();
            backend.insert_raw("k", raw);
            let cache = NodeCache::new(backend, "k");
            assert_eq!(cache.load(), None, "record {raw:?} should read as no cache");
        }
    }

    #[test]
    fn record_without_timestamp_is_accepted() {
        let backend = MemoryCache::new();
        backend.insert_raw(
            "k",
            r#"{"nodes": [{"name": "hermes", "role": "storage", "online": true}]}"#,
        );
        let cache = NodeCache::new(backend, "k");
        assert_eq!(
            cache.load(),
            Some(vec![StatusNode::new("hermes", StatusRole::Storage, true)])
        );
    }

    #[test]
    fn backend_failures_are_swallowed() {
        let cache = NodeCache::new(BrokenBackend, "k");
        cache.save(&sample_nodes());
        assert_eq!(cache.load(), None);
    }
}
