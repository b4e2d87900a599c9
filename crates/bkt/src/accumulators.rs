// ai
//! 🪣 Accumulators — where encoded records wait for their ride to the bucket.
//!
//! 🎬 *[records pile up in a buffer. the buffer grows. the thresholds watch.]*
//! *[one day the bouncer says "that's enough". the buffer leaves for storage, never to return.]*
//!
//! 🧠 Knowledge graph:
//! - `Buffer` trait: `append`, `size`, `count`, `age`, `flush`. `flush` takes `self` by value,
//!   so a buffer can only ever be flushed once. The compiler enforces it, not a boolean.
//! - Variants: `InMemoryBuffer` (a growable `Vec<u8>`) and `LocalFileBuffer` (a staging temp file).
//! - `BufferBackend` dispatches, `BufferFactory` picks the variant from `BufferType` config.
//! - `FlushTarget` bundles store + bucket + key + retrier, so `flush` reads like one sentence.
//! - Ages come from `tokio::time::Instant`, so paused-clock tests see exact durations.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SinkError;
use crate::retry::UploadRetrier;
use crate::stores::ObjectStore;
use crate::thresholds::BufferSnapshot;

pub mod in_mem;
pub mod local_file;

pub use in_mem::InMemoryBuffer;
pub use local_file::LocalFileBuffer;

/// 🔧 `buffer_type` in TOML: `"in_memory"` or `"local_file"`.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BufferType {
    #[default]
    InMemory,
    LocalFile,
}

/// ✂️ Every record in a buffer ends with this.
pub(crate) const RECORD_SEPARATOR: u8 = b'\n';

/// ✂️ Does `record` still need a separator? Codecs that already end records in `\n` don't.
pub(crate) fn needs_separator(record: &[u8]) -> bool {
    record.last() != Some(&RECORD_SEPARATOR)
}

/// 🎯 Everything a buffer needs to get itself into storage.
#[derive(Debug, Clone, Copy)]
pub struct FlushTarget<'a> {
    pub store: &'a dyn ObjectStore,
    pub bucket: &'a str,
    pub key: &'a str,
    pub retrier: &'a UploadRetrier,
}

/// 🪣 An in-flight accumulation of encoded records.
///
/// # Contract 📜
/// - `append` fails with `SinkError::Write` on local I/O trouble.
/// - `flush` persists every appended byte under `target.key` (returns `Ok(true)`), or reports
///   `Ok(false)` once retries are spent. Either way the backing resource is released.
/// - `Err` from `flush` only means the retry loop was cancelled; resources are still released.
#[async_trait]
pub trait Buffer: std::fmt::Debug + Send + Sized {
    async fn append(&mut self, bytes: &[u8]) -> Result<(), SinkError>;
    fn size(&self) -> u64;
    fn count(&self) -> u64;
    fn age(&self) -> std::time::Duration;

    /// 📸 Freeze the vitals for a threshold check.
    fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            event_count: self.count(),
            size_bytes: self.size(),
            age: self.age(),
        }
    }

    async fn flush(self, target: FlushTarget<'_>) -> Result<bool, SinkError>;
}

/// 🎭 Whichever buffer the config asked for.
#[derive(Debug)]
pub enum BufferBackend {
    InMemory(InMemoryBuffer),
    LocalFile(LocalFileBuffer),
}

#[async_trait]
impl Buffer for BufferBackend {
    async fn append(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        match self {
            BufferBackend::InMemory(buffer) => buffer.append(bytes).await,
            BufferBackend::LocalFile(buffer) => buffer.append(bytes).await,
        }
    }

    fn size(&self) -> u64 {
        match self {
            BufferBackend::InMemory(buffer) => buffer.size(),
            BufferBackend::LocalFile(buffer) => buffer.size(),
        }
    }

    fn count(&self) -> u64 {
        match self {
            BufferBackend::InMemory(buffer) => buffer.count(),
            BufferBackend::LocalFile(buffer) => buffer.count(),
        }
    }

    fn age(&self) -> std::time::Duration {
        match self {
            BufferBackend::InMemory(buffer) => buffer.age(),
            BufferBackend::LocalFile(buffer) => buffer.age(),
        }
    }

    async fn flush(self, target: FlushTarget<'_>) -> Result<bool, SinkError> {
        match self {
            BufferBackend::InMemory(buffer) => buffer.flush(target).await,
            BufferBackend::LocalFile(buffer) => buffer.flush(target).await,
        }
    }
}

/// 🏭 Stamps out fresh buffers of the configured kind.
#[derive(Debug, Clone)]
pub struct BufferFactory {
    buffer_type: BufferType,
    staging_dir: PathBuf,
}

impl BufferFactory {
    /// 🏗️ `staging_dir` of `None` means the OS temp directory.
    pub fn new(buffer_type: BufferType, staging_dir: Option<PathBuf>) -> Self {
        Self {
            buffer_type,
            staging_dir: staging_dir.unwrap_or_else(std::env::temp_dir),
        }
    }

    pub fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }

    pub fn new_buffer(&self) -> Result<BufferBackend, SinkError> {
        Ok(match self.buffer_type {
            BufferType::InMemory => BufferBackend::InMemory(InMemoryBuffer::new()),
            BufferType::LocalFile => BufferBackend::LocalFile(LocalFileBuffer::create_in(&self.staging_dir)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_buffer_type_speaks_snake_case() {
        #[derive(Debug, Deserialize)]
        struct Holder {
            buffer_type: BufferType,
        }
        let holder: Holder = toml::from_str(r#"buffer_type = "local_file""#).expect("💀 parse");
        assert_eq!(holder.buffer_type, BufferType::LocalFile);
        let holder: Holder = toml::from_str(r#"buffer_type = "in_memory""#).expect("💀 parse");
        assert_eq!(holder.buffer_type, BufferType::InMemory);
    }

    #[tokio::test]
    async fn the_one_where_the_factory_honours_the_staging_dir() {
        let dir = tempfile::tempdir().expect("💀 tempdir");
        let factory = BufferFactory::new(BufferType::LocalFile, Some(dir.path().to_path_buf()));
        let buffer = factory.new_buffer().expect("💀 buffer");
        match &buffer {
            BufferBackend::LocalFile(file_buffer) => {
                assert!(file_buffer.path().starts_with(dir.path()));
            }
            other => panic!("💀 expected a staging file buffer, got {other:?}"),
        }

        let factory = BufferFactory::new(BufferType::InMemory, None);
        assert!(matches!(factory.new_buffer(), Ok(BufferBackend::InMemory(_))));
    }

    #[tokio::test]
    async fn the_one_where_both_buffer_kinds_upload_the_same_bytes() {
        use crate::retry::UploadRetrier;
        use crate::stores::InMemoryStore;

        let dir = tempfile::tempdir().expect("💀 tempdir");
        let store = InMemoryStore::new();
        let retrier = UploadRetrier::new(1, std::time::Duration::ZERO);
        let records: [&[u8]; 3] = [b"{\"a\":1}\n", b"no newline here", b"last"];

        for (buffer_type, key) in [(BufferType::InMemory, "mem"), (BufferType::LocalFile, "file")] {
            let mut buffer = BufferFactory::new(buffer_type, Some(dir.path().to_path_buf()))
                .new_buffer()
                .expect("💀 buffer");
            for record in records {
                buffer.append(record).await.expect("💀 append");
            }
            assert_eq!(buffer.size(), 29);
            let target = FlushTarget {
                store: &store,
                bucket: "b",
                key,
                retrier: &retrier,
            };
            assert!(buffer.flush(target).await.expect("💀 flush"));
        }

        let expected = bytes::Bytes::from_static(b"{\"a\":1}\nno newline here\nlast\n");
        assert_eq!(store.object("b", "mem").await, Some(expected.clone()));
        assert_eq!(store.object("b", "file").await, Some(expected));
    }
}
