// ai
//! 🧵 Workers — the ones who actually move the records while the Supervisor takes the credit.
//!
//! - `SourceWorker`: pulls batches from a source and pushes them through the `PipelineConnector`.
//! - `SinkWorker`: drains the `ConnectorBuffer` into the `SinkCoordinator`, and pokes it on a
//!   ticker so idle buffers still get flushed on time.
//!
//! ⚠️ Private to the supervisor. Nobody else spawns these. 🦆

use anyhow::Result;
use tokio::task::JoinHandle;

mod sink_worker;
mod source_worker;

pub(super) use sink_worker::SinkWorker;
pub(super) use source_worker::SourceWorker;

/// 🏗️ A background worker. Consumes itself on start and reports how it ended.
pub(super) trait Worker {
    fn start(self) -> JoinHandle<Result<()>>;
}
