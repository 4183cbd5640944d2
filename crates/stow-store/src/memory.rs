use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use stow_types::RemoteLocation;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectMetadata, ObjectStorageClient};

/// One stored object with its upload-time attributes.
#[derive(Clone, Debug)]
struct StoredBlob {
    data: Vec<u8>,
    content_type: String,
    metadata: ObjectMetadata,
    updated: DateTime<Utc>,
}

/// In-memory, HashMap-based remote object store.
///
/// Intended for tests and embedding. Objects are keyed by their full
/// `scheme://bucket/key` address and held behind a `RwLock`.
pub struct InMemoryObjectStorage {
    objects: RwLock<HashMap<String, StoredBlob>>,
    read_only: bool,
}

impl InMemoryObjectStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            read_only: false,
        }
    }

    /// A store that rejects every mutation, including metadata patches.
    pub fn read_only() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            read_only: true,
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Sorted addresses of all stored objects.
    pub fn object_paths(&self) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut paths: Vec<String> = map.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Content type recorded at upload, if the object exists.
    pub fn content_type(&self, location: &RemoteLocation) -> Option<String> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(&location.to_string()).map(|b| b.content_type.clone())
    }

    /// Insert an object directly, bypassing staged writes.
    pub fn insert(&self, location: &RemoteLocation, data: Vec<u8>, metadata: ObjectMetadata) {
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(
            location.to_string(),
            StoredBlob {
                data,
                content_type: "application/octet-stream".into(),
                metadata,
                updated: Utc::now(),
            },
        );
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStorageClient for InMemoryObjectStorage {
    fn exists(&self, location: &RemoteLocation) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(&location.to_string()))
    }

    fn get(&self, location: &RemoteLocation) -> StoreResult<Vec<u8>> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(&location.to_string())
            .map(|b| b.data.clone())
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }

    fn put(&self, location: &RemoteLocation, data: Vec<u8>, content_type: &str) -> StoreResult<()> {
        self.ensure_writable()?;
        let mut map = self.objects.write().expect("lock poisoned");
        // A new upload is a new object generation: metadata does not carry over.
        map.insert(
            location.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
                metadata: ObjectMetadata::new(),
                updated: Utc::now(),
            },
        );
        Ok(())
    }

    fn delete(&self, location: &RemoteLocation) -> StoreResult<()> {
        self.ensure_writable()?;
        let mut map = self.objects.write().expect("lock poisoned");
        map.remove(&location.to_string())
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }

    fn updated_at(&self, location: &RemoteLocation) -> StoreResult<DateTime<Utc>> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(&location.to_string())
            .map(|b| b.updated)
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }

    fn get_metadata(&self, location: &RemoteLocation) -> StoreResult<ObjectMetadata> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(&location.to_string())
            .map(|b| b.metadata.clone())
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }

    fn patch_metadata(&self, location: &RemoteLocation, patch: &ObjectMetadata) -> StoreResult<()> {
        self.ensure_writable()?;
        let mut map = self.objects.write().expect("lock poisoned");
        let blob = map
            .get_mut(&location.to_string())
            .ok_or_else(|| StoreError::NotFound(location.to_string()))?;
        blob.metadata
            .extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStorage")
            .field("object_count", &self.len())
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(path: &str) -> RemoteLocation {
        RemoteLocation::parse(path).unwrap().unwrap()
    }

    #[test]
    fn put_and_get() {
        let store = InMemoryObjectStorage::new();
        let l = loc("gs://b/k.bin");
        store.put(&l, b"data".to_vec(), "application/octet-stream").unwrap();
        assert!(store.exists(&l).unwrap());
        assert_eq!(store.get(&l).unwrap(), b"data");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryObjectStorage::new();
        assert!(store.get(&loc("gs://b/none")).unwrap_err().is_not_found());
        assert!(store.delete(&loc("gs://b/none")).unwrap_err().is_not_found());
    }

    #[test]
    fn patch_merges_metadata() {
        let store = InMemoryObjectStorage::new();
        let l = loc("gs://b/k.bin");
        let mut existing = ObjectMetadata::new();
        existing.insert("owner".into(), "etl".into());
        store.insert(&l, vec![1], existing);

        let mut patch = ObjectMetadata::new();
        patch.insert("run".into(), "42".into());
        store.patch_metadata(&l, &patch).unwrap();

        let meta = store.get_metadata(&l).unwrap();
        assert_eq!(meta.get("owner").map(String::as_str), Some("etl"));
        assert_eq!(meta.get("run").map(String::as_str), Some("42"));
    }

    #[test]
    fn put_resets_metadata() {
        let store = InMemoryObjectStorage::new();
        let l = loc("gs://b/k.bin");
        let mut existing = ObjectMetadata::new();
        existing.insert("stale".into(), "yes".into());
        store.insert(&l, vec![1], existing);

        store.put(&l, vec![2], "application/octet-stream").unwrap();
        assert!(store.get_metadata(&l).unwrap().is_empty());
    }

    #[test]
    fn read_only_rejects_mutation() {
        let store = InMemoryObjectStorage::read_only();
        let l = loc("gs://b/k.bin");
        let err = store.put(&l, vec![], "text/plain").unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
        let err = store.patch_metadata(&l, &ObjectMetadata::new()).unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
    }

    #[test]
    fn object_paths_sorted() {
        let store = InMemoryObjectStorage::new();
        store.put(&loc("gs://b/z"), vec![], "t").unwrap();
        store.put(&loc("gs://b/a"), vec![], "t").unwrap();
        assert_eq!(store.object_paths(), vec!["gs://b/a", "gs://b/z"]);
    }
}
