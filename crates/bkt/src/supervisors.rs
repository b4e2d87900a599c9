// ai
//! 🎬 *[camera pans across two pipelines and the connector between them]*
//! 🎬 "In a world where ingest outruns archive..."
//! 🎬 "One supervisor wires them together, and knows when to pull the plug."
//!
//! 📦 The Supervisor builds and runs the whole thing:
//! - store + `SinkCoordinator` from `sink_config` / `store_config`
//! - a `ConnectorBuffer` sized by `runtime.queue_capacity`
//! - a `PipelineConnector` named `[ingest-archive]`, started on that buffer
//! - a `SourceWorker` (ingest: source → connector) and a `SinkWorker` (archive: buffer → coordinator)
//!
//! 🧠 Shutdown choreography:
//! 1. Whichever happens first: the source runs dry, a worker dies, or `stop` is cancelled.
//! 2. `connector.stop()` then `buffer.close()`: ingest can no longer write, archive drains what is queued.
//! 3. The sink worker flushes the last buffer and exits. Its error wins over the source's,
//!    because a dead archive is what makes ingest see "not active".
//! 4. The `abort` token cancels in-flight upload retries for when waiting is no longer an option.
//!
//! ⚠️ Workers stay private to this module. 🔒

mod workers;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app_config::AppConfig;
use crate::common::Event;
use crate::connectors::{ConnectorBuffer, PipelineConnector};
use crate::sink_service::{SinkCoordinator, SinkStats};
use crate::sources::SourceBackend;
use crate::stores::{ObjectStore, StoreBackend};
use workers::{SinkWorker, SourceWorker, Worker};

/// 🏷️ The pipeline whose output the connector consumes.
pub(crate) const INGEST_PIPELINE: &str = "ingest";
/// 🏷️ The pipeline whose buffer the connector fills.
pub(crate) const ARCHIVE_PIPELINE: &str = "archive";

pub(crate) struct Supervisor {
    app_config: AppConfig,
    stop: CancellationToken,
    abort: CancellationToken,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self {
            app_config,
            stop: CancellationToken::new(),
            abort: CancellationToken::new(),
        }
    }

    /// 🛑 `stop`: finish gracefully (drain + final flush). `abort`: also cancel upload retries.
    pub(crate) fn with_tokens(mut self, stop: CancellationToken, abort: CancellationToken) -> Self {
        self.stop = stop;
        self.abort = abort;
        self
    }

    pub(crate) async fn run(self) -> Result<SinkStats> {
        let config = &self.app_config;

        let store = StoreBackend::from_config(&config.store_config, config.sink_config.max_connection_retries)
            .await
            .context("💀 could not build the object store")?;
        let store: Arc<dyn ObjectStore> = Arc::new(store);
        let coordinator = Arc::new(
            SinkCoordinator::from_config(&config.sink_config, store, self.abort.clone())
                .context("💀 the sink configuration is not usable")?,
        );

        let buffer: ConnectorBuffer<Event> = ConnectorBuffer::new(config.runtime.queue_capacity);
        let connector = Arc::new(
            PipelineConnector::new(INGEST_PIPELINE)
                .with_source_pipeline_name(ARCHIVE_PIPELINE)
                .with_write_timeout(config.runtime.write_timeout()),
        );
        connector.start(buffer.clone());

        let source = SourceBackend::from_config(&config.source_config)
            .await
            .context("💀 could not open the source")?;

        info!(
            "🚀 running [{}-{}] into bucket '{}' (queue capacity {})",
            INGEST_PIPELINE,
            ARCHIVE_PIPELINE,
            coordinator.bucket(),
            buffer.capacity()
        );

        let mut sink_handle = SinkWorker::new(
            buffer.clone(),
            coordinator.clone(),
            config.runtime.batch_size,
            config.runtime.age_check_interval(),
        )
        .start();
        let mut source_handle = SourceWorker::new(source, connector.clone()).start();

        let mut source_outcome = None;
        let mut sink_outcome = None;
        tokio::select! {
            outcome = &mut source_handle => source_outcome = Some(outcome),
            outcome = &mut sink_handle => sink_outcome = Some(outcome),
            _ = self.stop.cancelled() => info!("🛑 stop requested, winding down [{}]", INGEST_PIPELINE),
        }

        connector.stop();
        buffer.close();

        let source_outcome = match source_outcome {
            Some(outcome) => outcome,
            None => source_handle.await,
        };
        let sink_outcome = match sink_outcome {
            Some(outcome) => outcome,
            None => sink_handle.await,
        };

        sink_outcome.context("💀 the sink worker panicked")??;
        match source_outcome.context("💀 the source worker panicked")? {
            Err(e) if self.stop.is_cancelled() => {
                warn!("⚠️ source stopped on request: {:#}", e);
            }
            other => other?,
        }

        let stats = coordinator.stats().await;
        info!("✅ run complete: {:?}", stats);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::RuntimeConfig;
    use crate::sink_service::SinkConfig;
    use crate::sources::{InMemorySourceConfig, SourceConfig};
    use crate::stores::{FileStoreConfig, StoreConfig};

    fn config_for(root: &std::path::Path, lines: Vec<String>, event_count: u64) -> AppConfig {
        let sink_config: SinkConfig = toml::from_str(&format!(
            r#"
            bucket = "archive"
            [object_key]
            path_prefix = "events/%{{yyyy}}/"
            name_pattern = "part"
            unique_suffix = true
            [threshold]
            event_count = {event_count}
            event_collect_secs = 60
            "#
        ))
        .expect("💀 sink config");
        AppConfig {
            source_config: SourceConfig::InMemory(InMemorySourceConfig {
                lines,
                ..InMemorySourceConfig::default()
            }),
            sink_config,
            store_config: StoreConfig::File(FileStoreConfig {
                root_dir: root.to_path_buf(),
            }),
            runtime: RuntimeConfig {
                queue_capacity: 2,
                batch_size: 3,
                ..RuntimeConfig::default()
            },
        }
    }

    fn stored_lines(root: &std::path::Path) -> Vec<String> {
        let mut lines = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir).expect("💀 read dir") {
                let path = entry.expect("💀 entry").path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    let text = std::fs::read_to_string(&path).expect("💀 read object");
                    lines.extend(text.lines().map(str::to_string));
                }
            }
        }
        lines.sort();
        lines
    }

    #[tokio::test]
    async fn the_one_where_every_event_makes_it_from_source_to_bucket() {
        let root = tempfile::tempdir().expect("💀 tempdir");
        let lines: Vec<String> = (0..23).map(|n| format!(r#"{{"n":{n}}}"#)).collect();

        let stats = Supervisor::new(config_for(root.path(), lines.clone(), 5))
            .run()
            .await
            .expect("💀 run");

        assert_eq!(stats.events_accepted, 23);
        assert_eq!(stats.events_flushed, 23);
        assert_eq!(stats.buffers_flushed, 5);
        let mut expected = lines;
        expected.sort();
        assert_eq!(stored_lines(root.path()), expected);
    }

    #[tokio::test]
    async fn the_one_where_a_bad_template_stops_the_run_before_it_starts() {
        let root = tempfile::tempdir().expect("💀 tempdir");
        let mut config = config_for(root.path(), vec!["x".to_string()], 5);
        config.sink_config.object_key.name_pattern = "events-%{yyyy}-%{MM}".to_string();

        let outcome = Supervisor::new(config).run().await;

        let message = format!("{:#}", outcome.expect_err("💀 should refuse to start"));
        assert!(message.contains("only one date-time token"), "{message}");
    }

    #[tokio::test]
    async fn the_one_where_an_early_stop_still_flushes_what_was_buffered() {
        let root = tempfile::tempdir().expect("💀 tempdir");
        let stop = CancellationToken::new();
        stop.cancel();

        let stats = Supervisor::new(config_for(root.path(), vec!["only".to_string()], 0))
            .with_tokens(stop, CancellationToken::new())
            .run()
            .await
            .expect("💀 a requested stop is not a failure");

        assert_eq!(stats.events_dropped, 0);
        assert_eq!(stats.events_accepted, stats.events_flushed);
        assert_eq!(stored_lines(root.path()).len() as u64, stats.events_flushed);
    }
}
