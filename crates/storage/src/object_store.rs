//! Object store trait and the in-memory development implementation.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mediaplan_core::{HubError, HubResult};

/// A stored blob with its metadata.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: String,
    pub size: usize,
    pub stored_at: DateTime<Utc>,
}

/// Blob storage seam.
///
/// Production: an S3-compatible client (put_object / get_object /
/// delete_object). Development and tests use [`MemoryObjectStore`].
pub trait ObjectStore: Send + Sync {
    fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> HubResult<()>;
    fn get(&self, key: &str) -> HubResult<StoredObject>;
    fn delete(&self, key: &str) -> bool;
    fn exists(&self, key: &str) -> bool;
}

/// In-memory object store keyed by storage key.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> HubResult<()> {
        let object = StoredObject {
            key: key.to_string(),
            size: bytes.len(),
            bytes,
            content_type: content_type.to_string(),
            stored_at: Utc::now(),
        };
        self.objects.insert(key.to_string(), object);
        Ok(())
    }

    fn get(&self, key: &str) -> HubResult<StoredObject> {
        self.objects
            .get(key)
            .map(|r| r.value().clone())
            .ok_or_else(|| HubError::Storage(format!("object '{key}' not found")))
    }

    fn delete(&self, key: &str) -> bool {
        self.objects.remove(key).is_some()
    }

    fn exists(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_roundtrip() {
        let store = MemoryObjectStore::new();
        store
            .put("2024/abc.png", Bytes::from_static(b"\x89PNG"), "image/png")
            .unwrap();
        let obj = store.get("2024/abc.png").unwrap();
        assert_eq!(obj.size, 4);
        assert_eq!(obj.content_type, "image/png");
    }

    #[test]
    fn get_missing_is_storage_error() {
        let store = MemoryObjectStore::new();
        assert!(store.get("nope").is_err());
        assert!(!store.delete("nope"));
    }
}
