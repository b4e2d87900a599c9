// ai
//! 📂 FileStore — a "bucket" that is really just a directory. Every object lands at
//! `root_dir/bucket/key`, parent directories created on demand.
//!
//! Good for local runs, demos, and anyone who wants to `ls` their archive. 🦆

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use crate::error::StoreError;
use crate::stores::{ObjectStore, PutBody};

/// 🔧 `[store_config.File]` in TOML.
#[derive(Debug, Deserialize, Clone)]
pub struct FileStoreConfig {
    pub root_dir: PathBuf,
}

/// 📂 Objects as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root_dir: PathBuf,
}

impl FileStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// 📍 Where `bucket`/`key` lives on disk.
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root_dir.join(bucket).join(key)
    }
}

fn io_failure(path: &Path, error: std::io::Error) -> StoreError {
    StoreError::Client(format!("'{}': {error}", path.display()))
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn put(&self, bucket: &str, key: &str, body: &PutBody) -> Result<(), StoreError> {
        let destination = self.object_path(bucket, key);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_failure(parent, e))?;
        }

        match body {
            PutBody::Bytes(bytes) => tokio::fs::write(&destination, bytes)
                .await
                .map_err(|e| io_failure(&destination, e))?,
            PutBody::File(source) => {
                tokio::fs::copy(source, &destination)
                    .await
                    .map_err(|e| io_failure(source, e))?;
            }
        }
        trace!("📂 wrote {} to '{}'", body.describe(), destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn the_one_where_keys_with_slashes_become_directories() {
        let root = tempfile::tempdir().expect("💀 tempdir");
        let store = FileStore::new(root.path());

        store
            .put(
                "archive",
                "events/2026/10/18/app.ndjson",
                &PutBody::Bytes(Bytes::from_static(b"{}\n")),
            )
            .await
            .expect("💀 put");

        let landed = root.path().join("archive/events/2026/10/18/app.ndjson");
        assert_eq!(std::fs::read(landed).expect("💀 read back"), b"{}\n");
    }

    #[tokio::test]
    async fn the_one_where_file_bodies_are_copied_not_moved() {
        let root = tempfile::tempdir().expect("💀 tempdir");
        let staged = root.path().join("staged.buffer");
        std::fs::write(&staged, b"a\nb\n").expect("💀 write");
        let store = FileStore::new(root.path().join("objects"));

        store
            .put("b", "k.log", &PutBody::File(staged.clone()))
            .await
            .expect("💀 put");

        assert!(staged.exists());
        assert_eq!(
            std::fs::read(store.object_path("b", "k.log")).expect("💀 read back"),
            b"a\nb\n"
        );
    }
}
