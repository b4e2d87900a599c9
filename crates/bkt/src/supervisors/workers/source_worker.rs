// ai
//! 🚰 SourceWorker — the ingest pipeline's whole job: read a batch, hand it to the connector, repeat.
//!
//! When the connector pushes back (full buffer) this worker simply waits inside `output`.
//! When the connector says "not active" the worker stops and reports it. No silent drops.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::Worker;
use crate::common::Event;
use crate::connectors::PipelineConnector;
use crate::sources::{Source, SourceBackend};

#[derive(Debug)]
pub(crate) struct SourceWorker {
    source: SourceBackend,
    connector: Arc<PipelineConnector<Event>>,
}

impl SourceWorker {
    pub(crate) fn new(source: SourceBackend, connector: Arc<PipelineConnector<Event>>) -> Self {
        Self { source, connector }
    }
}

impl Worker for SourceWorker {
    fn start(mut self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let mut forwarded = 0usize;
            while let Some(batch) = self
                .source
                .next_batch()
                .await
                .context("💀 SourceWorker could not read the next batch")?
            {
                let size = batch.len();
                self.connector
                    .output(batch)
                    .await
                    .context("💀 SourceWorker could not hand a batch to the connector")?;
                forwarded += size;
                debug!("🚰 SourceWorker forwarded {} events ({} total)", size, forwarded);
            }
            info!("🏁 SourceWorker: source exhausted after {} events", forwarded);
            Ok(())
        })
    }
}
