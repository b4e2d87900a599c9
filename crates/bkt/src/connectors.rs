// ai
//! 🔗 Connectors — the pipe between two pipelines.
//!
//! 🎬 *[the ingest pipeline produces faster than the archive pipeline can consume.]*
//! *[the connector does not drop anything. it just makes ingest wait its turn.]*
//!
//! 🧠 Knowledge graph:
//! - `ConnectorBuffer<T>`: bounded FIFO on `async_channel`, one producer, one consumer.
//! - `PipelineConnector<T>`: the sink of one pipeline and the source of the next.
//!   Initialized → Running (`start` attaches a buffer) → Stopped (terminal).
//! - A full buffer blocks `output` up to the write timeout; a stopped connector fails fast.
//!   Both failures name the `[sink-source]` pipeline pair.

pub mod connector_buffer;
pub mod pipeline_connector;

pub use connector_buffer::{BufferWriteError, ConnectorBuffer};
pub use pipeline_connector::{ConnectorState, DEFAULT_WRITE_TIMEOUT, PipelineConnector};
