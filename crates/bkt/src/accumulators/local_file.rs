// ai
//! 💾 LocalFileBuffer — records staged on disk instead of in RAM.
//!
//! 🎬 *[a temp file is born in the staging directory. it is named `bkt-<random>.buffer`.]*
//! *[it will be uploaded once. then it will be deleted. it knows this. it accepts this.]*
//!
//! 🧠 Knowledge graph:
//! - One uniquely-named temp file per buffer, created via `tempfile::Builder` in the staging dir.
//! - Appends go through a tokio `BufWriter`. Each record ends in `\n`; the separator is only
//!   added when the codec did not already end the record with one.
//! - `flush`: drain the writer, close the handle, upload the *path* (streamed by the store),
//!   then delete the file. The delete happens on success, on failure, and on cancellation.
//!   A failed delete is logged, never escalated.
//! - If the buffer is dropped without a flush, `TempPath`'s own `Drop` removes the file.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::Instant;
use tracing::{error, info, trace, warn};

use crate::accumulators::{Buffer, FlushTarget, RECORD_SEPARATOR, needs_separator};
use crate::error::SinkError;
use crate::stores::PutBody;

#[derive(Debug)]
pub struct LocalFileBuffer {
    writer: BufWriter<File>,
    path: TempPath,
    size: u64,
    count: u64,
    created_at: Instant,
}

impl LocalFileBuffer {
    /// 🏗️ Create the staging file inside `staging_dir`.
    pub fn create_in(staging_dir: &Path) -> Result<Self, SinkError> {
        let staged = tempfile::Builder::new()
            .prefix("bkt-")
            .suffix(".buffer")
            .tempfile_in(staging_dir)
            .map_err(|e| SinkError::write(staging_dir.display().to_string(), e))?;
        let (file, path) = staged.into_parts();
        trace!("💾 staging buffer opened at '{}'", path.display());

        Ok(Self {
            writer: BufWriter::new(File::from_std(file)),
            path,
            size: 0,
            count: 0,
            created_at: Instant::now(),
        })
    }

    /// 🧪 Wrap an already-open file, for forcing write failures in tests.
    #[cfg(test)]
    pub(crate) fn over_file(file: std::fs::File, path: TempPath) -> Self {
        Self {
            writer: BufWriter::new(File::from_std(file)),
            path,
            size: 0,
            count: 0,
            created_at: Instant::now(),
        }
    }

    /// 📍 Where the staging file lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl Buffer for LocalFileBuffer {
    async fn append(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(|e| SinkError::write(self.location(), e))?;
        let mut written = bytes.len() as u64;
        if needs_separator(bytes) {
            self.writer
                .write_all(&[RECORD_SEPARATOR])
                .await
                .map_err(|e| SinkError::write(self.location(), e))?;
            written += 1;
        }
        self.size += written;
        self.count += 1;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    async fn flush(self, target: FlushTarget<'_>) -> Result<bool, SinkError> {
        let LocalFileBuffer {
            mut writer,
            path,
            size,
            count,
            ..
        } = self;
        let FlushTarget {
            store,
            bucket,
            key,
            retrier,
        } = target;

        let finished = writer.shutdown().await;
        drop(writer);
        let outcome = match finished {
            Err(e) => {
                error!(
                    "💀 could not finish writing staging file '{}' for '{}/{}': {}",
                    path.display(),
                    bucket,
                    key,
                    e
                );
                Ok(false)
            }
            Ok(()) => {
                let body = PutBody::File(path.to_path_buf());
                let body = &body;
                retrier
                    .attempt(key, move || store.put(bucket, key, body))
                    .await
            }
        };

        match &outcome {
            Ok(true) => info!("🪣 flushed {} events ({} bytes) to '{}/{}'", count, size, bucket, key),
            Ok(false) => warn!("🗑️ dropped {} events ({} bytes) meant for '{}/{}'", count, size, bucket, key),
            Err(e) => warn!("🛑 flush of '{}/{}' interrupted: {}", bucket, key, e),
        }

        let location = path.display().to_string();
        if let Err(e) = path.close() {
            warn!("⚠️ could not delete staging file '{}': {}", location, e);
        }
        outcome
    }
}
