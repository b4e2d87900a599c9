// ai
//! 🧠 InMemoryBuffer — a `Vec<u8>` with a stopwatch. Fast, simple, and gone if the process is.
//! Records are `\n`-terminated exactly like the staging file, so both kinds upload the same bytes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::accumulators::{Buffer, FlushTarget, RECORD_SEPARATOR, needs_separator};
use crate::error::SinkError;
use crate::stores::PutBody;

#[derive(Debug)]
pub struct InMemoryBuffer {
    bytes: Vec<u8>,
    count: u64,
    created_at: Instant,
}

impl InMemoryBuffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            count: 0,
            created_at: Instant::now(),
        }
    }
}

impl Default for InMemoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Buffer for InMemoryBuffer {
    async fn append(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.bytes.extend_from_slice(bytes);
        if needs_separator(bytes) {
            self.bytes.push(RECORD_SEPARATOR);
        }
        self.count += 1;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    async fn flush(self, target: FlushTarget<'_>) -> Result<bool, SinkError> {
        let (count, size) = (self.count, self.size());
        let body = PutBody::Bytes(Bytes::from(self.bytes));
        let body = &body;
        let FlushTarget {
            store,
            bucket,
            key,
            retrier,
        } = target;

        let uploaded = retrier
            .attempt(key, move || store.put(bucket, key, body))
            .await?;
        if uploaded {
            info!("🪣 flushed {} events ({} bytes) to '{}/{}'", count, size, bucket, key);
        } else {
            warn!("🗑️ dropped {} events ({} bytes) meant for '{}/{}'", count, size, bucket, key);
        }
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::UploadRetrier;
    use crate::stores::InMemoryStore;

    #[tokio::test]
    async fn the_one_where_every_appended_byte_lands_in_one_object() {
        let mut buffer = InMemoryBuffer::new();
        buffer.append(b"{\"a\":1}\n").await.expect("💀 append");
        buffer.append(b"{\"a\":2}\n").await.expect("💀 append");
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.size(), 16);

        let store = InMemoryStore::new();
        let retrier = UploadRetrier::new(1, Duration::ZERO);
        let uploaded = buffer
            .flush(FlushTarget {
                store: &store,
                bucket: "b",
                key: "k.ndjson",
                retrier: &retrier,
            })
            .await
            .expect("💀 flush");

        assert!(uploaded);
        assert_eq!(
            store.object("b", "k.ndjson").await,
            Some(Bytes::from_static(b"{\"a\":1}\n{\"a\":2}\n"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_age_ticks_with_the_clock() {
        let buffer = InMemoryBuffer::new();
        tokio::time::advance(Duration::from_secs(7)).await;
        assert_eq!(buffer.age(), Duration::from_secs(7));
        assert_eq!(buffer.snapshot().age, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn the_one_where_a_failed_flush_says_false() {
        let mut buffer = InMemoryBuffer::new();
        buffer.append(b"x\n").await.expect("💀 append");
        let store = InMemoryStore::new();
        store.fail_next_puts(u32::MAX);
        let retrier = UploadRetrier::new(3, Duration::ZERO);

        let uploaded = buffer
            .flush(FlushTarget {
                store: &store,
                bucket: "b",
                key: "k",
                retrier: &retrier,
            })
            .await
            .expect("💀 not cancelled");

        assert!(!uploaded);
        assert_eq!(store.put_attempts(), 3);
        assert!(store.is_empty().await);
    }
}
