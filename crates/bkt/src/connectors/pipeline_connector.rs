// ai
//! 🔗 PipelineConnector — sink of one pipeline, source of the next.
//!
//! 🎬 *[ingest hands a record to the connector. the connector tries the buffer. the buffer is full.]*
//! *[the connector waits. and waits. it is allowed to wait a very long time.]*
//! *[then archive stops. the very next `output` call hears "not active" immediately.]*
//!
//! 🧠 Knowledge graph:
//! - Initialized → Running once `start` attaches a `ConnectorBuffer`. `stop` makes it Stopped for good.
//! - `output(records)` checks the state before *every* record, then does one blocking write.
//!   A timeout on any record aborts the rest of the batch.
//! - Errors carry both pipeline names: `[sink_pipeline-source_pipeline]`.
//! - `stop` never interrupts an in-flight write; it only makes the next check fail.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::connectors::connector_buffer::{BufferWriteError, ConnectorBuffer};
use crate::error::SinkError;

/// ⏳ "Block until there is room." `i32::MAX` milliseconds, a little under 25 days.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

const UNNAMED_PIPELINE: &str = "unknown";

/// 🚦 Where a connector is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Initialized,
    Running,
    Stopped,
}

/// 🔗 Forwards records from the pipeline it sinks into the buffer of the pipeline it feeds.
#[derive(Debug)]
pub struct PipelineConnector<T> {
    sink_pipeline_name: String,
    source_pipeline_name: String,
    buffer: RwLock<Option<ConnectorBuffer<T>>>,
    stop_requested: AtomicBool,
    write_timeout: Duration,
}

impl<T: Send> PipelineConnector<T> {
    /// 🏗️ `sink_pipeline_name` is the upstream pipeline this connector terminates.
    pub fn new(sink_pipeline_name: impl Into<String>) -> Self {
        Self {
            sink_pipeline_name: sink_pipeline_name.into(),
            source_pipeline_name: UNNAMED_PIPELINE.to_string(),
            buffer: RwLock::new(None),
            stop_requested: AtomicBool::new(false),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    /// 🏷️ Name the downstream pipeline whose buffer we write into.
    pub fn with_source_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.source_pipeline_name = name.into();
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn sink_pipeline_name(&self) -> &str {
        &self.sink_pipeline_name
    }

    pub fn source_pipeline_name(&self) -> &str {
        &self.source_pipeline_name
    }

    /// 🚀 Attach the downstream buffer. Ignored once stopped.
    pub fn start(&self, buffer: ConnectorBuffer<T>) {
        if self.stop_requested.load(Ordering::SeqCst) {
            warn!(
                "⚠️ PipelineConnector [{}]: start after stop ignored",
                self.pair()
            );
            return;
        }
        *self.buffer.write().unwrap_or_else(PoisonError::into_inner) = Some(buffer);
        info!(
            "🔗 PipelineConnector [{}]: attached to pipeline [{}]'s buffer",
            self.pair(),
            self.source_pipeline_name
        );
    }

    /// 🛑 Idempotent. Every later `output` fails without blocking.
    pub fn stop(&self) {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            info!("🛑 PipelineConnector [{}]: stopped", self.pair());
        }
    }

    pub fn state(&self) -> ConnectorState {
        if self.stop_requested.load(Ordering::SeqCst) {
            ConnectorState::Stopped
        } else if self.buffer.read().unwrap_or_else(PoisonError::into_inner).is_some() {
            ConnectorState::Running
        } else {
            ConnectorState::Initialized
        }
    }

    /// 📤 Write each record into the downstream buffer, blocking while it is full.
    pub async fn output(&self, records: Vec<T>) -> Result<(), SinkError> {
        let total = records.len();
        for (index, record) in records.into_iter().enumerate() {
            let buffer = self.running_buffer()?;
            match buffer.write(record, self.write_timeout).await {
                Ok(()) => {}
                Err(BufferWriteError::Timeout(timeout)) => {
                    error!(
                        "💀 PipelineConnector [{}]: timed out after {:?} on record {} of {}",
                        self.pair(),
                        timeout,
                        index + 1,
                        total
                    );
                    return Err(SinkError::ConnectorTimeout {
                        sink_pipeline: self.sink_pipeline_name.clone(),
                        source_pipeline: self.source_pipeline_name.clone(),
                        timeout,
                    });
                }
                Err(BufferWriteError::Closed) => return Err(self.inactive()),
            }
        }
        debug!("📤 PipelineConnector [{}]: forwarded {} records", self.pair(), total);
        Ok(())
    }

    fn running_buffer(&self) -> Result<ConnectorBuffer<T>, SinkError> {
        if self.stop_requested.load(Ordering::SeqCst) {
            return Err(self.inactive());
        }
        self.buffer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| self.inactive())
    }

    fn inactive(&self) -> SinkError {
        error!(
            "💀 PipelineConnector [{}]: pipeline [{}] is not active",
            self.pair(),
            self.source_pipeline_name
        );
        SinkError::ConnectorInactive {
            sink_pipeline: self.sink_pipeline_name.clone(),
            source_pipeline: self.source_pipeline_name.clone(),
        }
    }

    fn pair(&self) -> String {
        format!("{}-{}", self.sink_pipeline_name, self.source_pipeline_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector() -> PipelineConnector<u32> {
        PipelineConnector::new("ingest").with_source_pipeline_name("archive")
    }

    #[tokio::test]
    async fn the_one_where_output_before_start_is_inactive() {
        let connector = connector();
        assert_eq!(connector.state(), ConnectorState::Initialized);
        let outcome = connector.output(vec![1]).await;
        match outcome {
            Err(e @ SinkError::ConnectorInactive { .. }) => {
                assert_eq!(
                    e.to_string(),
                    "PipelineConnector [ingest-archive]: Pipeline [archive] is not active, cannot proceed"
                );
            }
            other => panic!("💀 expected inactive, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn the_one_where_records_flow_while_running() {
        let connector = connector();
        let buffer = ConnectorBuffer::new(10);
        connector.start(buffer.clone());
        assert_eq!(connector.state(), ConnectorState::Running);

        connector.output(vec![1, 2, 3]).await.expect("💀 output");
        assert_eq!(buffer.read_batch(10).await, Some(vec![1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_never_drained_buffer_times_out_instead_of_hanging() {
        let connector = connector().with_write_timeout(Duration::from_millis(100));
        let buffer = ConnectorBuffer::new(0);
        connector.start(buffer.clone());

        let outcome = connector.output(vec![1, 2, 3]).await;

        match outcome {
            Err(e @ SinkError::ConnectorTimeout { .. }) => {
                let message = e.to_string();
                assert!(message.starts_with("PipelineConnector [ingest-archive]: Timed out"), "{message}");
                assert!(message.contains("pipeline [archive]'s buffer"), "{message}");
            }
            other => panic!("💀 expected timeout, got {other:?}"),
        }
        // -- 📬 the first record fit, the second timed out, the third never tried
        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_stop_is_final_and_idempotent() {
        let connector = connector();
        let buffer = ConnectorBuffer::new(10);
        connector.start(buffer.clone());
        connector.stop();
        connector.stop();
        assert_eq!(connector.state(), ConnectorState::Stopped);

        let outcome = tokio::time::timeout(Duration::from_secs(1), connector.output(vec![7]))
            .await
            .expect("💀 a stopped connector must not block");
        assert!(matches!(outcome, Err(SinkError::ConnectorInactive { .. })));
        assert!(buffer.is_empty());

        connector.start(ConnectorBuffer::new(1));
        assert_eq!(connector.state(), ConnectorState::Stopped);
    }

    #[tokio::test]
    async fn the_one_where_stopping_mid_batch_fails_the_rest() {
        let connector = std::sync::Arc::new(connector());
        let buffer = ConnectorBuffer::new(1);
        connector.start(buffer.clone());

        let the_writer = {
            let connector = connector.clone();
            tokio::spawn(async move { connector.output(vec![1, 2, 3]).await })
        };
        // -- ⏳ first record fills the slot, second blocks; drain one, then stop
        while buffer.is_empty() {
            tokio::task::yield_now().await;
        }
        connector.stop();
        let first = buffer.read_batch(1).await;
        assert_eq!(first, Some(vec![1]));

        let outcome = the_writer.await.expect("💀 writer panicked");
        assert!(matches!(outcome, Err(SinkError::ConnectorInactive { .. })));
    }
}
