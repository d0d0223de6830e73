// Copyright 2026 The Precond Authors
// SPDX-License-Identifier: Apache-2.0

//! In-memory reference store with atomic precondition evaluation.
//!
//! This is the hermetic backend the harness's own test suite runs against.
//! Preconditions are evaluated and applied under a single lock, so the
//! exactly-one-writer-wins invariant holds for any interleaving of handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use md5::{Digest, Md5};
use precond_core::types::{ETag, Precondition};
use precond_core::{Error, Result};

use crate::store::{ObjectStore, StoreFactory};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    etag: ETag,
}

/// An in-memory object store scoped to a single bucket.
///
/// Handles minted via [`MemoryStore::handle`] (or the [`StoreFactory`]
/// impl) share the underlying object map, the way separate clients share a
/// server, while remaining independent values owned by their tasks.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an independent handle backed by the same object map.
    #[must_use]
    pub fn handle(&self) -> Self {
        self.clone()
    }

    fn content_etag(body: &[u8]) -> ETag {
        let digest: [u8; 16] = Md5::digest(body).into();
        ETag::from_md5(&digest)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Bytes, precondition: &Precondition) -> Result<ETag> {
        let mut objects = self.objects.lock().expect("object map lock poisoned");

        // Evaluate and apply under one lock: no check-then-act window.
        match precondition {
            Precondition::None => {}
            Precondition::IfNoneMatchAny => {
                if objects.contains_key(key) {
                    return Err(Error::PreconditionFailed { key: key.to_string() });
                }
            }
            Precondition::IfMatch(expected) => match objects.get(key) {
                Some(current) if current.etag == *expected => {}
                // Absent object or stale ETag both fail the match.
                _ => return Err(Error::PreconditionFailed { key: key.to_string() }),
            },
        }

        let etag = Self::content_etag(&body);
        objects.insert(key.to_string(), StoredObject { body, etag: etag.clone() });
        Ok(etag)
    }

    async fn get(&self, key: &str) -> Result<(Bytes, ETag)> {
        let objects = self.objects.lock().expect("object map lock poisoned");
        objects
            .get(key)
            .map(|obj| (obj.body.clone(), obj.etag.clone()))
            .ok_or_else(|| Error::NotFound { key: key.to_string() })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut objects = self.objects.lock().expect("object map lock poisoned");
        objects.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.lock().expect("object map lock poisoned");
        let mut keys: Vec<String> =
            objects.keys().filter(|k| k.starts_with(prefix)).cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn head_bucket(&self) -> Result<()> {
        Ok(())
    }
}

impl StoreFactory for MemoryStore {
    type Store = MemoryStore;

    fn connect(&self) -> Result<MemoryStore> {
        Ok(self.handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> String {
        format!("object-{}", &uuid::Uuid::new_v4().to_string()[..8])
    }

    #[tokio::test]
    async fn test_if_none_match_creates_when_absent() {
        let store = MemoryStore::new();
        let key = random_key();

        let etag = store
            .put(&key, Bytes::from_static(b"content"), &Precondition::IfNoneMatchAny)
            .await
            .expect("create should apply");

        let (body, read_etag) = store.get(&key).await.expect("get");
        assert_eq!(body.as_ref(), b"content");
        assert_eq!(read_etag, etag);
    }

    #[tokio::test]
    async fn test_if_none_match_rejects_when_present() {
        let store = MemoryStore::new();
        let key = random_key();

        store.put(&key, Bytes::from_static(b"original"), &Precondition::None).await.expect("seed");

        let err = store
            .put(&key, Bytes::from_static(b"clobber"), &Precondition::IfNoneMatchAny)
            .await
            .expect_err("existing object must reject");
        assert!(err.is_precondition_failed());

        // Rejected write has zero effect.
        let (body, _) = store.get(&key).await.expect("get");
        assert_eq!(body.as_ref(), b"original");
    }

    #[tokio::test]
    async fn test_if_match_applies_only_on_current_etag() {
        let store = MemoryStore::new();
        let key = random_key();

        let e1 = store
            .put(&key, Bytes::from_static(b"Version 1"), &Precondition::None)
            .await
            .expect("seed");

        let e2 = store
            .put(&key, Bytes::from_static(b"Version 2"), &Precondition::IfMatch(e1.clone()))
            .await
            .expect("matching etag should apply");
        assert_ne!(e1, e2, "a successful mutation must produce a new ETag");

        // The seed ETag is now stale.
        let err = store
            .put(&key, Bytes::from_static(b"Version 3"), &Precondition::IfMatch(e1))
            .await
            .expect_err("stale etag must reject");
        assert!(err.is_precondition_failed());

        let (body, _) = store.get(&key).await.expect("get");
        assert_eq!(body.as_ref(), b"Version 2");
    }

    #[tokio::test]
    async fn test_if_match_rejects_absent_object() {
        let store = MemoryStore::new();
        let err = store
            .put(
                "missing",
                Bytes::from_static(b"x"),
                &Precondition::IfMatch(ETag::new("\"wrongetag12345\"")),
            )
            .await
            .expect_err("if-match on absent key must fail");
        assert!(err.is_precondition_failed());
    }

    #[tokio::test]
    async fn test_unmodified_object_keeps_its_etag() {
        let store = MemoryStore::new();
        let key = random_key();

        store.put(&key, Bytes::from_static(b"stable"), &Precondition::None).await.expect("put");
        let (_, first) = store.get(&key).await.expect("get");
        let (_, second) = store.get(&key).await.expect("get");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let key = random_key();

        // Absent key: not an error.
        store.delete(&key).await.expect("delete of absent key");

        store.put(&key, Bytes::from_static(b"x"), &Precondition::None).await.expect("put");
        store.delete(&key).await.expect("delete");
        store.delete(&key).await.expect("second delete");

        let err = store.get(&key).await.expect_err("gone");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let store = MemoryStore::new();
        for key in ["test-a", "test-b", "other-c"] {
            store.put(key, Bytes::from_static(b"x"), &Precondition::None).await.expect("put");
        }

        let keys = store.list("test-").await.expect("list");
        assert_eq!(keys, vec!["test-a".to_string(), "test-b".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_if_match_writers_exactly_one_wins() {
        let store = MemoryStore::new();
        let key = random_key();

        let e0 = store
            .put(&key, Bytes::from_static(b"Initial value: 0"), &Precondition::None)
            .await
            .expect("seed");

        let mut handles = Vec::new();
        for i in 0..8 {
            let handle = store.handle();
            let key = key.clone();
            let e0 = e0.clone();
            handles.push(tokio::spawn(async move {
                handle
                    .put(
                        &key,
                        Bytes::from(format!("Written by writer-{i}").into_bytes()),
                        &Precondition::IfMatch(e0),
                    )
                    .await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.expect("task") {
                Ok(_) => wins += 1,
                Err(err) => assert!(err.is_precondition_failed()),
            }
        }
        assert_eq!(wins, 1, "exactly one concurrent writer may win");
    }
}
