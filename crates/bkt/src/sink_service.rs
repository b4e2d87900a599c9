// ai
//! 🎯 SinkCoordinator — the one place where records become buffers and buffers become objects.
//!
//! 🎬 COLD OPEN — INT. ARCHIVE PIPELINE — THE LOCK IS HELD
//!
//! Eight workers call `accept` at once. Seven of them wait. The eighth encodes a record,
//! glances at the thresholds, flushes the full buffer to the bucket (retrying through a
//! 503 or two), swaps in a fresh buffer, appends, and only then lets go of the lock.
//! Nobody races. Nobody double-flushes. Throughput files a complaint; correctness ignores it. 🦆
//!
//! 🧠 Knowledge graph:
//! - States: no active buffer (initial) → accumulating. `current: Option<BufferBackend>` *is* the state.
//! - `accept(events)`: per record: encode → `ThresholdPolicy::should_flush` → flush + swap → append.
//!   The whole call runs under one `tokio::sync::Mutex`, upload retries included.
//! - Flush failures (retries spent) are logged and counted; the buffer is gone, a new one starts.
//! - Encode failures follow `EncodeErrorPolicy`: `abort` drops the rest of the batch, `skip` drops
//!   just the bad record. Either way `accept` returns `Ok` with a summary.
//! - Write failures (staging file I/O) abandon that buffer without an upload. Its events are
//!   counted lost, the failing record is dropped, and later records start a fresh buffer.
//! - The only `Err` out of `accept` is cancellation of an in-progress upload retry.
//! - `flush_expired` handles idle buffers; `shutdown` flushes whatever is left.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::accumulators::{Buffer, BufferBackend, BufferFactory, BufferType, FlushTarget};
use crate::codecs::{Codec, CodecBackend, CodecConfig};
use crate::common::Event;
use crate::error::SinkError;
use crate::naming::{ObjectKeyConfig, ObjectKeyNamer};
use crate::retry::UploadRetrier;
use crate::stores::ObjectStore;
use crate::thresholds::{BufferSnapshot, ThresholdConfig, ThresholdOptions, ThresholdPolicy};

/// 🔁 Reference retry budget for uploads and for the store client's connection attempts.
const DEFAULT_MAX_RETRIES: u32 = 5;
/// ⏱️ Reference pause between upload attempts.
const DEFAULT_UPLOAD_RETRY_DELAY_MS: u64 = 5000;

/// 🔧 `[sink_config]` in TOML. Co-located with the coordinator it configures.
#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    /// 🪣 Destination bucket.
    pub bucket: String,
    #[serde(default)]
    pub object_key: ObjectKeyConfig,
    #[serde(default)]
    pub buffer_type: BufferType,
    /// 💾 Where staging files go. Defaults to the OS temp dir.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    pub threshold: ThresholdConfig,
    #[serde(default = "default_max_retries")]
    pub max_upload_retries: u32,
    #[serde(default = "default_max_retries")]
    pub max_connection_retries: u32,
    #[serde(default = "default_upload_retry_delay_ms")]
    pub upload_retry_delay_ms: u64,
    /// 🎲 Extra random delay as a fraction of `upload_retry_delay_ms`. `0.0` = none.
    #[serde(default)]
    pub upload_retry_jitter: f64,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub on_encode_error: EncodeErrorPolicy,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_upload_retry_delay_ms() -> u64 {
    DEFAULT_UPLOAD_RETRY_DELAY_MS
}

/// 🧬 What to do with the rest of a batch when one record will not encode.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EncodeErrorPolicy {
    /// 🛑 Drop the failing record and everything after it in the same `accept` call.
    #[default]
    Abort,
    /// ⏭️ Drop only the failing record.
    Skip,
}

/// 📊 Running totals for one coordinator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    pub events_accepted: u64,
    pub events_dropped: u64,
    pub encode_failures: u64,
    pub write_failures: u64,
    pub buffers_flushed: u64,
    pub buffers_lost: u64,
    pub events_flushed: u64,
    pub events_lost: u64,
    pub bytes_flushed: u64,
}

/// 🧾 What one `accept` call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcceptSummary {
    pub appended: usize,
    pub dropped: usize,
    pub flushes: usize,
    pub encode_failures: usize,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    current: Option<BufferBackend>,
    stats: SinkStats,
}

/// 🎯 Serializes encode, threshold check, flush, swap and append for one sink.
#[derive(Debug)]
pub struct SinkCoordinator {
    bucket: String,
    key_namer: ObjectKeyNamer,
    thresholds: ThresholdOptions,
    buffer_factory: BufferFactory,
    codec: CodecBackend,
    store: Arc<dyn ObjectStore>,
    retrier: UploadRetrier,
    on_encode_error: EncodeErrorPolicy,
    state: Mutex<CoordinatorState>,
}

impl SinkCoordinator {
    /// 🏗️ Assemble from already-validated parts.
    pub fn new(
        bucket: impl Into<String>,
        key_namer: ObjectKeyNamer,
        thresholds: ThresholdOptions,
        buffer_factory: BufferFactory,
        codec: CodecBackend,
        store: Arc<dyn ObjectStore>,
        retrier: UploadRetrier,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key_namer,
            thresholds,
            buffer_factory,
            codec,
            store,
            retrier,
            on_encode_error: EncodeErrorPolicy::default(),
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    pub fn with_encode_error_policy(mut self, policy: EncodeErrorPolicy) -> Self {
        self.on_encode_error = policy;
        self
    }

    /// 🏗️ Validate `config` and build a coordinator around `store`.
    /// Template and threshold problems surface here, before a single record moves.
    pub fn from_config(
        config: &SinkConfig,
        store: Arc<dyn ObjectStore>,
        cancel: CancellationToken,
    ) -> Result<Self, SinkError> {
        if config.bucket.trim().is_empty() {
            return Err(SinkError::Configuration("sink bucket must not be empty".to_string()));
        }
        let codec = CodecBackend::from_config(&config.codec);
        let key_namer = ObjectKeyNamer::from_config(&config.object_key, Some(codec.name()))?;
        let thresholds = ThresholdOptions::try_from(&config.threshold)?;
        let retrier = UploadRetrier::new(
            config.max_upload_retries,
            std::time::Duration::from_millis(config.upload_retry_delay_ms),
        )
        .with_jitter(config.upload_retry_jitter)
        .with_cancellation(cancel);

        Ok(Self::new(
            config.bucket.clone(),
            key_namer,
            thresholds,
            BufferFactory::new(config.buffer_type, config.staging_dir.clone()),
            codec,
            store,
            retrier,
        )
        .with_encode_error_policy(config.on_encode_error))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn thresholds(&self) -> &ThresholdOptions {
        &self.thresholds
    }

    /// 📥 Encode and buffer `events`, flushing whenever a threshold says so.
    pub async fn accept(&self, events: Vec<Event>) -> Result<AcceptSummary, SinkError> {
        let mut state = self.state.lock().await;
        let mut summary = AcceptSummary::default();
        let total = events.len();

        for (index, event) in events.iter().enumerate() {
            let encoded = match self.codec.encode(event) {
                Ok(encoded) => encoded,
                Err(e) => {
                    summary.encode_failures += 1;
                    state.stats.encode_failures += 1;
                    match self.on_encode_error {
                        EncodeErrorPolicy::Abort => {
                            let abandoned = total - index;
                            summary.dropped += abandoned;
                            state.stats.events_dropped += abandoned as u64;
                            error!(
                                "💀 {} (record {} of {}); dropping it and the {} after it",
                                e,
                                index + 1,
                                total,
                                abandoned - 1
                            );
                            break;
                        }
                        EncodeErrorPolicy::Skip => {
                            summary.dropped += 1;
                            state.stats.events_dropped += 1;
                            warn!("⏭️ {} (record {} of {}); skipping it", e, index + 1, total);
                            continue;
                        }
                    }
                }
            };

            let must_flush = state
                .current
                .as_ref()
                .is_some_and(|buffer| ThresholdPolicy::should_flush(&buffer.snapshot(), &self.thresholds));
            if must_flush {
                if let Some(full) = state.current.take() {
                    self.flush_buffer(full, &mut state.stats).await?;
                    summary.flushes += 1;
                }
            }

            if self.append_record(&mut state, &encoded).await {
                summary.appended += 1;
                state.stats.events_accepted += 1;
            } else {
                summary.dropped += 1;
                state.stats.events_dropped += 1;
            }
        }

        debug!(
            "📥 accept: {} appended, {} dropped, {} flushes",
            summary.appended, summary.dropped, summary.flushes
        );
        Ok(summary)
    }

    /// ⏰ Flush the active buffer if it has outlived `max_age`. Returns whether a flush happened.
    pub async fn flush_expired(&self) -> Result<bool, SinkError> {
        let mut state = self.state.lock().await;
        let expired = state
            .current
            .as_ref()
            .is_some_and(|buffer| ThresholdPolicy::is_expired(&buffer.snapshot(), &self.thresholds));
        if !expired {
            return Ok(false);
        }
        match state.current.take() {
            Some(buffer) => {
                debug!("⏰ active buffer expired after {:?}", buffer.age());
                self.flush_buffer(buffer, &mut state.stats).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 🏁 Flush whatever is still buffered and hand back the final tally.
    pub async fn shutdown(&self) -> Result<SinkStats, SinkError> {
        let mut state = self.state.lock().await;
        if let Some(buffer) = state.current.take() {
            self.flush_buffer(buffer, &mut state.stats).await?;
        }
        info!("🏁 sink for bucket '{}' shut down: {:?}", self.bucket, state.stats);
        Ok(state.stats)
    }

    pub async fn stats(&self) -> SinkStats {
        self.state.lock().await.stats
    }

    /// 📸 Vitals of the active buffer, if there is one.
    pub async fn current_snapshot(&self) -> Option<BufferSnapshot> {
        self.state.lock().await.current.as_ref().map(|buffer| buffer.snapshot())
    }

    /// ✍️ Append to the active buffer, creating one if needed. `false` means the record was dropped.
    ///
    /// A write failure abandons the whole buffer without uploading it: a staging file that
    /// failed mid-write may end in a torn record. Its events count as lost, the failing record
    /// is dropped, and the next record starts a fresh buffer.
    async fn append_record(&self, state: &mut CoordinatorState, encoded: &[u8]) -> bool {
        let mut buffer = match state.current.take() {
            Some(buffer) => buffer,
            None => match self.buffer_factory.new_buffer() {
                Ok(buffer) => buffer,
                Err(e) => {
                    state.stats.write_failures += 1;
                    error!("💀 could not start a new buffer, dropping the record: {}", e);
                    return false;
                }
            },
        };

        match buffer.append(encoded).await {
            Ok(()) => {
                state.current = Some(buffer);
                true
            }
            Err(e) => {
                let BufferSnapshot {
                    event_count,
                    size_bytes,
                    ..
                } = buffer.snapshot();
                state.stats.write_failures += 1;
                if event_count > 0 {
                    state.stats.buffers_lost += 1;
                    state.stats.events_lost += event_count;
                }
                error!(
                    "💀 {}; abandoning a buffer holding {} events ({} bytes) for bucket '{}' and dropping the record",
                    e, event_count, size_bytes, self.bucket
                );
                // -- 🗑️ dropping a staging buffer deletes its file
                drop(buffer);
                false
            }
        }
    }

    /// 🪣 Name and upload one retired buffer. Empty buffers are dropped without an upload.
    async fn flush_buffer(&self, buffer: BufferBackend, stats: &mut SinkStats) -> Result<bool, SinkError> {
        let BufferSnapshot {
            event_count,
            size_bytes,
            ..
        } = buffer.snapshot();
        if event_count == 0 {
            debug!("🫙 retiring an empty buffer without uploading");
            return Ok(true);
        }

        let key = self.key_namer.generate_key(&Utc::now());
        let uploaded = buffer
            .flush(FlushTarget {
                store: self.store.as_ref(),
                bucket: &self.bucket,
                key: &key,
                retrier: &self.retrier,
            })
            .await?;

        if uploaded {
            stats.buffers_flushed += 1;
            stats.events_flushed += event_count;
            stats.bytes_flushed += size_bytes;
        } else {
            stats.buffers_lost += 1;
            stats.events_lost += event_count;
            error!(
                "💀 lost {} events ({} bytes) for '{}/{}' after {} upload attempt(s); continuing with a new buffer",
                event_count,
                size_bytes,
                self.bucket,
                key,
                self.retrier.max_attempts()
            );
        }
        Ok(uploaded)
    }
}
