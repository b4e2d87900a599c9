// ai
//! 🎬 *[the connector buffer fills with events. somewhere, a sink waits.]*
//! *[the clock on the wall reads 2:47am. the ticker ticks anyway.]*
//!
//! 🗑️ SinkWorker — drains the `ConnectorBuffer` into the `SinkCoordinator`.
//!
//! 🧠 Knowledge graph:
//! - `select!` between the next batch and a ticker. Batches go to `accept`, ticks to
//!   `flush_expired`, so a buffer that stops receiving records still leaves on time.
//! - `read_batch` is cancel-safe: losing the race to the ticker never loses a record.
//! - Buffer closed and drained → `shutdown` flushes the last buffer and the worker exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::Worker;
use crate::common::Event;
use crate::connectors::ConnectorBuffer;
use crate::sink_service::SinkCoordinator;

#[derive(Debug)]
pub(crate) struct SinkWorker {
    buffer: ConnectorBuffer<Event>,
    coordinator: Arc<SinkCoordinator>,
    batch_size: usize,
    age_check_interval: Duration,
}

impl SinkWorker {
    pub(crate) fn new(
        buffer: ConnectorBuffer<Event>,
        coordinator: Arc<SinkCoordinator>,
        batch_size: usize,
        age_check_interval: Duration,
    ) -> Self {
        Self {
            buffer,
            coordinator,
            batch_size: batch_size.max(1),
            age_check_interval: age_check_interval.max(Duration::from_millis(1)),
        }
    }
}

impl Worker for SinkWorker {
    fn start(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            debug!("📥 SinkWorker started draining the connector buffer...");
            let mut ticker = tokio::time::interval(self.age_check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    batch = self.buffer.read_batch(self.batch_size) => match batch {
                        Some(events) => {
                            let summary = self
                                .coordinator
                                .accept(events)
                                .await
                                .context("💀 SinkWorker: the coordinator gave up on a batch")?;
                            debug!("🪣 SinkWorker: {:?}", summary);
                        }
                        None => break,
                    },
                    _ = ticker.tick() => {
                        self.coordinator
                            .flush_expired()
                            .await
                            .context("💀 SinkWorker: flushing an expired buffer failed")?;
                    }
                }
            }

            debug!("🏁 SinkWorker: buffer closed and drained. Shutting down.");
            self.coordinator
                .shutdown()
                .await
                .context("💀 SinkWorker failed to flush the final buffer")?;
            Ok(())
        })
    }
}
