// ── Local key-value cache ──
//
// String-keyed, string-valued persistent storage that survives restarts.
// Callers serialize their own values; the listener stores JSON arrays of
// records as cold-start placeholders.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::CacheError;

/// The local cache boundary.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Remove a key. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// All keys currently stored, sorted.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;
}

/// Read and deserialize a JSON value stored under `key`.
pub async fn load_json<T: DeserializeOwned>(
    cache: &dyn LocalCache,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON and store it under `key`.
pub async fn store_json<T: Serialize + Sync + ?Sized>(
    cache: &dyn LocalCache,
    key: &str,
    value: &T,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, &raw).await
}

// ── In-memory cache ─────────────────────────────────────────────────

/// Volatile cache, for tests and sessions that opt out of persistence.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

// ── File-backed cache ───────────────────────────────────────────────

const FILE_EXTENSION: &str = "json";

/// One file per key under a directory.
///
/// Keys are encoded into file names: ASCII alphanumerics plus `-`, `_`
/// and `.` pass through, every other byte becomes `%XX`.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Use `dir`, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "opened file cache");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey { key: key.to_owned() });
        }
        Ok(self
            .dir
            .join(format!("{}.{FILE_EXTENSION}", encode_key(key))))
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        if b == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(b);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a truncated snapshot.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_key)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Memory cache whose reads take `delay`, for exercising listeners that
/// are torn down while a placeholder load is in flight.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct SlowCache {
    inner: MemoryCache,
    delay: std::time::Duration,
}

#[cfg(test)]
impl SlowCache {
    pub(crate) fn new(delay: std::time::Duration) -> Self {
        Self {
            inner: MemoryCache::new(),
            delay,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl LocalCache for SlowCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.inner.keys().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn key_encoding_round_trips_awkward_keys() {
        for key in ["cache:courses", "messages?recipientId=u1", "users/u1/likedTeachers", "plain"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('/'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[tokio::test]
    async fn memory_cache_get_set_remove() {
        let cache = MemoryCache::new();
        assert!(cache.get("k").await.unwrap().is_none());
        cache.set("k", "v").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        cache.remove("k").await.unwrap();
        cache.remove("k").await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn file_cache_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = FileCache::open(dir.path()).await.unwrap();
            cache.set("cache:students", "[1,2,3]").await.unwrap();
        }
        let reopened = FileCache::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("cache:students").await.unwrap().as_deref(),
            Some("[1,2,3]")
        );
        assert_eq!(reopened.keys().await.unwrap(), vec!["cache:students"]);
    }

    #[tokio::test]
    async fn file_cache_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).await.unwrap();
        assert!(cache.get("nothing").await.unwrap().is_none());
        cache.remove("nothing").await.unwrap();
    }

    #[tokio::test]
    async fn file_cache_rejects_empty_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).await.unwrap();
        assert!(matches!(
            cache.set("", "x").await,
            Err(CacheError::InvalidKey { .. })
        ));
    }

    #[tokio::test]
    async fn json_helpers_round_trip_through_cache() {
        let cache = MemoryCache::new();
        store_json(&cache, "k", &vec![1, 2, 3]).await.unwrap();
        let loaded: Option<Vec<i32>> = load_json(&cache, "k").await.unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn json_helpers_surface_corrupt_values() {
        let cache = MemoryCache::new();
        cache.set("k", "{not json").await.unwrap();
        let loaded: Result<Option<Vec<i32>>, _> = load_json(&cache, "k").await;
        assert!(matches!(loaded, Err(CacheError::Serialization(_))));
    }
}
