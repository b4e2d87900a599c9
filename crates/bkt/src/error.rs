// ai
//! 💀 Errors — a field guide to everything that can go wrong between a record and a bucket.
//!
//! 🎬 *[a record leaves home. it never calls. its parents check the logs.]*
//!
//! Two families live here:
//! - [`StoreError`]: what an object store says when a `put` fails. Always retryable.
//!   The [`UploadRetrier`](crate::retry::UploadRetrier) eats these for breakfast.
//! - [`SinkError`]: everything else the core can report. Config problems, codec
//!   tantrums, staging-file I/O, connector timeouts, and a cancelled retry loop.
//!
//! 🧠 Knowledge graph:
//! - Library code returns `Result<T, SinkError>` so callers can match on the variant.
//! - The supervisor and the CLI wrap these in `anyhow` with `.context(...)`, same as always.
//! - Connector messages name the `[sink-source]` pipeline pair so the 3am reader knows
//!   which pipe burst without opening a debugger. 🦆

use std::time::Duration;

use thiserror::Error;

/// 🪣 A failed `put`. The store either said no, or we never reached it.
///
/// Both flavors are retried identically. The split exists for the log line,
/// because "S3 returned 503" and "DNS is on fire" deserve different facial expressions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 📡 The store received the request and rejected it (throttling, 5xx, access denied...).
    #[error("the object store rejected the request: {0}")]
    Transient(String),
    /// 🔌 We never got a proper answer: client-side failure, network, local I/O on the body.
    #[error("client or network failure while talking to the object store: {0}")]
    Client(String),
}

/// 💀 The core's error type. One enum, many sad endings.
#[derive(Debug, Error)]
pub enum SinkError {
    /// 🔧 A naming template failed validation. Fatal at startup, never retried.
    #[error("💀 invalid naming template '{template}': {reason}")]
    InvalidPattern { template: String, reason: String },

    /// 🔧 Any other configuration value that cannot work (zero-sized thresholds, empty bucket...).
    #[error("💀 invalid configuration: {0}")]
    Configuration(String),

    /// 🧬 One record refused to become bytes.
    #[error("💀 the {codec} codec could not encode a record: {reason}")]
    Encoding { codec: &'static str, reason: String },

    /// 💾 Local accumulation I/O failed (staging file create/write/flush).
    #[error("💀 local buffer write failed for '{location}': {source}")]
    Write {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// ⏳ The connector waited for buffer space longer than it was allowed to.
    #[error(
        "PipelineConnector [{sink_pipeline}-{source_pipeline}]: Timed out after {timeout:?} writing to pipeline [{source_pipeline}]'s buffer"
    )]
    ConnectorTimeout {
        sink_pipeline: String,
        source_pipeline: String,
        timeout: Duration,
    },

    /// 🚫 The connector is stopped, or nobody attached a buffer yet.
    #[error(
        "PipelineConnector [{sink_pipeline}-{source_pipeline}]: Pipeline [{source_pipeline}] is not active, cannot proceed"
    )]
    ConnectorInactive {
        sink_pipeline: String,
        source_pipeline: String,
    },

    /// 🛑 Somebody pulled the plug while an upload was waiting to retry.
    #[error("🛑 upload of '{key}' was cancelled while waiting to retry")]
    Cancelled { key: String },
}

impl SinkError {
    /// 🏗️ Shorthand for building a [`SinkError::InvalidPattern`] without the struct-literal ceremony.
    pub(crate) fn invalid_pattern(template: impl Into<String>, reason: impl Into<String>) -> Self {
        SinkError::InvalidPattern {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// 🏗️ Shorthand for a [`SinkError::Write`] that remembers where the disk let us down.
    pub(crate) fn write(location: impl Into<String>, source: std::io::Error) -> Self {
        SinkError::Write {
            location: location.into(),
            source,
        }
    }
}
