// ai
//! 🧠 InMemoryStore — a bucket that lives and dies with the process.
//!
//! Holds every object in a `BTreeMap` behind `Arc<Mutex<...>>` so clones share one vault
//! and tests can inspect what landed. It can also be told to fail the next N puts,
//! which is how the retry and flush-failure paths get exercised without a real outage.
//!
//! ⚠️ Not for production. Your data would survive exactly one `Ctrl-C`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::StoreError;
use crate::stores::{ObjectStore, PutBody};

/// 🧠 Shared, cloneable, inspectable object store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    objects: Arc<Mutex<BTreeMap<(String, String), Bytes>>>,
    put_attempts: Arc<AtomicU32>,
    failures_to_inject: Arc<AtomicU32>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 💣 Make the next `n` puts fail with a transient error. `u32::MAX` means "forever, basically".
    pub fn fail_next_puts(&self, n: u32) {
        self.failures_to_inject.store(n, Ordering::SeqCst);
    }

    /// 🔢 Every `put` call so far, successful or not.
    pub fn put_attempts(&self) -> u32 {
        self.put_attempts.load(Ordering::SeqCst)
    }

    /// 📦 One object's bytes.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// 🗝️ All keys in `bucket`, sorted.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// 📚 Every (bucket, key, bytes) triple, sorted by bucket then key.
    pub async fn objects(&self) -> Vec<(String, String, Bytes)> {
        self.objects
            .lock()
            .await
            .iter()
            .map(|((bucket, key), bytes)| (bucket.clone(), key.clone(), bytes.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }

    fn take_injected_failure(&self) -> bool {
        self.failures_to_inject
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(&self, bucket: &str, key: &str, body: &PutBody) -> Result<(), StoreError> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        if self.take_injected_failure() {
            return Err(StoreError::Transient(format!(
                "injected failure for '{bucket}/{key}'"
            )));
        }

        let bytes = match body {
            PutBody::Bytes(bytes) => bytes.clone(),
            PutBody::File(path) => Bytes::from(
                tokio::fs::read(path)
                    .await
                    .map_err(|e| StoreError::Client(format!("reading '{}': {e}", path.display())))?,
            ),
        };
        trace!("🧠 stored {} bytes at '{}/{}'", bytes.len(), bucket, key);
        self.objects
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }
}
