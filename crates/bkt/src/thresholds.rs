// ai
//! 🚦 Thresholds — the bouncer that decides when a buffer has had enough.
//!
//! Three limits, checked *before* a record is admitted:
//! - 📄 event count (optional, `0` switches it off)
//! - 📦 cumulative bytes
//! - ⏱️ wall-clock age of the buffer
//!
//! Trip any one of them and the current buffer gets flushed before the next record
//! walks in. The "+1" on the count check is the whole trick: we flush right *before*
//! the buffer would exceed its count, not one record after.
//!
//! 🧠 Knowledge graph:
//! - `ThresholdConfig`: the serde shape (`event_count`, `maximum_size`, `event_collect_secs`).
//! - `ThresholdOptions`: the validated, immutable form the coordinator holds.
//! - `BufferSnapshot`: a frozen (count, size, age) reading taken from a live buffer.
//! - `ThresholdPolicy::should_flush`: pure function, no I/O, no clock reads of its own.

use std::time::Duration;

use bytesize::ByteSize;
use serde::Deserialize;

use crate::error::SinkError;

/// 📦 Default byte ceiling per buffer. 50 MB, the same number every S3 sink seems to pick.
const DEFAULT_MAXIMUM_SIZE: ByteSize = ByteSize::mb(50);

/// ⏱️ The longest a buffer may collect events for, in seconds. One hour. Go home, buffer.
const MAX_EVENT_COLLECT_SECS: u64 = 3600;

/// 🔧 Threshold knobs as they appear in TOML / `BKT_*` env vars.
///
/// ```toml
/// [sink_config.threshold]
/// event_count = 10000          # 0 = unbounded on count
/// maximum_size = "50mb"        # bytesize strings or plain integers
/// event_collect_secs = 60
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct ThresholdConfig {
    /// 📄 Max records per buffer. Zero means "count doesn't matter, only size and age".
    #[serde(default)]
    pub event_count: u64,
    /// 📦 Max bytes per buffer.
    #[serde(default = "default_maximum_size")]
    pub maximum_size: ByteSize,
    /// ⏱️ Max buffer age in seconds.
    #[serde(alias = "event_collect")]
    pub event_collect_secs: u64,
}

fn default_maximum_size() -> ByteSize {
    DEFAULT_MAXIMUM_SIZE
}

/// 🚦 Validated, immutable threshold limits.
///
/// Invariant: `max_bytes > 0` and `max_age > 0`. `max_event_count` may be zero (disabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdOptions {
    max_event_count: u64,
    max_bytes: u64,
    max_age: Duration,
}

impl ThresholdOptions {
    /// 🏗️ Build options directly. Rejects a zero size or a zero age.
    pub fn new(max_event_count: u64, max_bytes: u64, max_age: Duration) -> Result<Self, SinkError> {
        if max_bytes == 0 {
            return Err(SinkError::Configuration(
                "threshold maximum_size must be greater than zero".to_string(),
            ));
        }
        if max_age.is_zero() {
            return Err(SinkError::Configuration(
                "threshold event_collect must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            max_event_count,
            max_bytes,
            max_age,
        })
    }

    pub fn max_event_count(&self) -> u64 {
        self.max_event_count
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// 🔢 Is the count limit switched on?
    pub fn counts_events(&self) -> bool {
        self.max_event_count > 0
    }
}

impl TryFrom<&ThresholdConfig> for ThresholdOptions {
    type Error = SinkError;

    fn try_from(config: &ThresholdConfig) -> Result<Self, Self::Error> {
        // -- ⏱️ config-level ceiling on age, on top of the >0 rule in `new`
        if config.event_collect_secs > MAX_EVENT_COLLECT_SECS {
            return Err(SinkError::Configuration(format!(
                "threshold event_collect_secs must be at most {MAX_EVENT_COLLECT_SECS}, got {}",
                config.event_collect_secs
            )));
        }
        Self::new(
            config.event_count,
            config.maximum_size.as_u64(),
            Duration::from_secs(config.event_collect_secs),
        )
    }
}

/// 📸 A frozen reading of a buffer's vital signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferSnapshot {
    pub event_count: u64,
    pub size_bytes: u64,
    pub age: Duration,
}

/// 🚦 The decision function. Zero-sized, because a policy with state is called a mood.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdPolicy;

impl ThresholdPolicy {
    /// 🎯 Must the buffer described by `snapshot` be flushed before admitting one more record?
    pub fn should_flush(snapshot: &BufferSnapshot, options: &ThresholdOptions) -> bool {
        let too_old = snapshot.age > options.max_age;
        let too_big = snapshot.size_bytes > options.max_bytes;
        if options.counts_events() {
            snapshot.event_count + 1 > options.max_event_count || too_old || too_big
        } else {
            too_old || too_big
        }
    }

    /// ⏰ Has the buffer outlived its welcome even without a new record knocking?
    pub fn is_expired(snapshot: &BufferSnapshot, options: &ThresholdOptions) -> bool {
        snapshot.age > options.max_age
    }
}
