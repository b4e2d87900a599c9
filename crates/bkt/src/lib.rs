// ai
//! 🪣 bkt — buffer records, name them after the clock, ship them to a bucket.
//!
//! 🧠 Knowledge graph:
//! - `sink_service::SinkCoordinator`: encode → threshold check → flush → append, one buffer at a time.
//! - `accumulators`: in-memory and staging-file buffers. `thresholds` decides when they are full.
//! - `naming`: date-pattern templates and object key composition.
//! - `retry::UploadRetrier` + `stores`: bounded-retry uploads to in-memory, local dir or S3.
//! - `connectors`: the bounded hand-off between an ingest pipeline and the sink's pipeline.
//! - `run` / `run_until`: wire a source to the sink and go.

pub mod accumulators;
pub mod app_config;
pub mod codecs;
pub mod common;
pub mod connectors;
pub mod error;
pub mod naming;
pub mod retry;
pub mod sink_service;
pub mod sources;
pub mod stores;
pub mod thresholds;

mod supervisors;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::app_config::AppConfig;
use crate::sink_service::SinkStats;
use crate::supervisors::Supervisor;

/// 🚀 Run until the source is exhausted.
pub async fn run(app_config: AppConfig) -> Result<SinkStats> {
    Supervisor::new(app_config)
        .run()
        .await
        .context("💀 bkt run failed")
}

/// 🛑 Run until the source is exhausted or `stop` fires. Cancelling `abort` also gives up
/// on uploads still being retried.
pub async fn run_until(
    app_config: AppConfig,
    stop: CancellationToken,
    abort: CancellationToken,
) -> Result<SinkStats> {
    Supervisor::new(app_config)
        .with_tokens(stop, abort)
        .run()
        .await
        .context("💀 bkt run failed")
}
