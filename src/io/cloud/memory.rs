//! In-memory object store.
//!
//! Buckets are created on first write. Useful for tests and for embedding the
//! engine where a real object store is not available.

use crate::io::cloud::store::{
    ObjectMetadata, ObjectStore, StoreError, StoreErrorKind, StoreResult,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

type BucketStorage = Arc<Mutex<HashMap<String, BTreeMap<String, StoredObject>>>>;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    acl: Option<String>,
}

#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    storage: BucketStorage,
    rejected_prefixes: Arc<Mutex<Vec<String>>>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `put_object` under `bucket/prefix` fail with
    /// `Authorization`.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the rejected prefixes is poisoned.
    pub fn reject_writes_under(&self, bucket: &str, prefix: &str) {
        self.rejected_prefixes
            .lock()
            .expect("rejected prefixes mutex poisoned")
            .push(format!("{bucket}/{prefix}"));
    }

    /// ACL recorded for an object, if the object exists.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the storage is poisoned.
    #[must_use]
    pub fn acl_of(&self, bucket: &str, key: &str) -> Option<Option<String>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.acl.clone())
    }

    /// Every key in a bucket, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the storage is poisoned.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8], acl: Option<&str>) -> StoreResult<()> {
        let full = format!("{bucket}/{key}");
        let rejected = self
            .rejected_prefixes
            .lock()
            .expect("rejected prefixes mutex poisoned")
            .iter()
            .any(|p| full.starts_with(p.as_str()));
        if rejected {
            return Err(StoreError::new(
                StoreErrorKind::Authorization,
                format!("writes to {full} are not allowed"),
            ));
        }
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.to_vec(),
                    acl: acl.map(str::to_string),
                },
            );
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.data.clone())
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorKind::NotFound,
                    format!("Object {bucket}/{key} not found"),
                )
            })
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> StoreResult<Vec<ObjectMetadata>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        let bucket_map = storage.get(bucket).ok_or_else(|| {
            StoreError::new(StoreErrorKind::NotFound, format!("Bucket {bucket} not found"))
        })?;

        Ok(bucket_map
            .iter()
            .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
            .map(|(key, o)| ObjectMetadata {
                key: key.clone(),
                size: o.data.len() as u64,
            })
            .collect())
    }

    fn object_exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        Ok(storage.get(bucket).is_some_and(|b| b.contains_key(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_list() {
        let store = MemoryObjectStore::new();
        store.put_object("b", "a/1.json", b"1", None).unwrap();
        store.put_object("b", "a/2.json", b"2", Some("private")).unwrap();
        store.put_object("b", "c/3.json", b"3", None).unwrap();

        assert_eq!(store.get_object("b", "a/2.json").unwrap(), b"2");
        let listed: Vec<String> = store
            .list_objects("b", Some("a/"))
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(listed, vec!["a/1.json", "a/2.json"]);
        assert_eq!(store.acl_of("b", "a/2.json"), Some(Some("private".into())));
        assert!(!store.object_exists("b", "zzz").unwrap());
        assert_eq!(
            store.get_object("b", "zzz").unwrap_err().kind,
            StoreErrorKind::NotFound
        );
    }

    #[test]
    fn rejected_prefix_fails_writes() {
        let store = MemoryObjectStore::new();
        store.reject_writes_under("b", "locked/");
        let err = store.put_object("b", "locked/x", b"x", None).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Authorization);
        assert!(store.put_object("b", "open/x", b"x", None).is_ok());
    }
}
