// ai
//! 🪣 Stores — the far end of the flush. Somewhere a bucket waits with its mouth open.
//!
//! 🎬 *[a buffer, fully grown, is handed a key and shown the door.]*
//! *["where am I going?" it asks. the StoreBackend shrugs. "depends on the config."]*
//!
//! 🧠 Knowledge graph:
//! - `ObjectStore::put(bucket, key, body)` is the only capability the sink needs.
//! - `PutBody` is either bytes (memory buffers) or a path (staging files stream from disk).
//! - Every failure is a `StoreError`, and both flavors get retried by the `UploadRetrier`.
//! - Pattern: trait → concrete impls (`InMemoryStore`, `FileStore`, `S3Store`) → `StoreBackend` enum.
//! - `StoreConfig` lives here, next to the stores it builds. 🦆

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::StoreError;

pub mod file;
pub mod in_mem;
pub mod s3;

pub use file::{FileStore, FileStoreConfig};
pub use in_mem::InMemoryStore;
pub use s3::{S3Store, S3StoreConfig};

/// 📦 What gets uploaded: an in-memory blob or a file on local disk.
#[derive(Debug, Clone)]
pub enum PutBody {
    Bytes(Bytes),
    File(PathBuf),
}

impl PutBody {
    /// 🏷️ Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            PutBody::Bytes(bytes) => format!("{} in-memory bytes", bytes.len()),
            PutBody::File(path) => format!("staging file '{}'", path.display()),
        }
    }
}

/// 🪣 Durably store one named blob.
///
/// # Contract 📜
/// - `Ok(())` means the object is persisted under `bucket`/`key`.
/// - The body may be replayed: a retry calls `put` again with the same `&PutBody`.
#[async_trait]
pub trait ObjectStore: std::fmt::Debug + Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: &PutBody) -> Result<(), StoreError>;
}

/// 🔧 `[store_config.*]` in TOML. Defaults to the in-memory store.
#[derive(Debug, Deserialize, Clone, Default)]
pub enum StoreConfig {
    #[default]
    InMemory,
    File(FileStoreConfig),
    S3(S3StoreConfig),
}

/// 🎭 The configured store.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    InMemory(InMemoryStore),
    File(FileStore),
    S3(S3Store),
}

impl StoreBackend {
    /// 🏗️ Build the store named by `config`. Only the S3 arm touches the network (credential lookup).
    pub async fn from_config(config: &StoreConfig, max_connection_retries: u32) -> Result<Self> {
        Ok(match config {
            StoreConfig::InMemory => StoreBackend::InMemory(InMemoryStore::new()),
            StoreConfig::File(file_config) => StoreBackend::File(FileStore::new(file_config.root_dir.clone())),
            StoreConfig::S3(s3_config) => {
                StoreBackend::S3(S3Store::connect(s3_config, max_connection_retries).await)
            }
        })
    }

    /// 🔍 The in-memory store, when that is what we are. Handy for summaries and tests.
    pub fn as_in_memory(&self) -> Option<&InMemoryStore> {
        match self {
            StoreBackend::InMemory(store) => Some(store),
            _ => None,
        }
    }
}

#[async_trait]
impl ObjectStore for StoreBackend {
    async fn put(&self, bucket: &str, key: &str, body: &PutBody) -> Result<(), StoreError> {
        match self {
            StoreBackend::InMemory(store) => store.put(bucket, key, body).await,
            StoreBackend::File(store) => store.put(bucket, key, body).await,
            StoreBackend::S3(store) => store.put(bucket, key, body).await,
        }
    }
}
