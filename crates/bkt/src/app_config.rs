// ai
//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment: `BKT_*` env vars as the base layer, an optional TOML file on top.
//! Nested keys in env vars use a double underscore: `BKT_SINK_CONFIG__BUCKET=archive`.
//!
//! 🧠 Knowledge graph:
//! - `AppConfig` is the whole document: `source_config`, `sink_config`, `store_config`, `runtime`.
//! - Each section's struct lives next to the code it configures. This file only glues them.
//! - `validate()` runs every check that would otherwise blow up mid-run: naming templates,
//!   thresholds, bucket, queue capacity. A bad config never moves a record.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::codecs::{Codec, CodecBackend};
use crate::error::SinkError;
use crate::naming::ObjectKeyNamer;
use crate::sink_service::SinkConfig;
use crate::sources::SourceConfig;
use crate::stores::StoreConfig;
use crate::thresholds::ThresholdOptions;

/// 🏷️ Env var prefix. `BKT_` as in bucket, not as in "bucket list", although same energy.
pub const ENV_PREFIX: &str = "BKT_";

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📡 Where records come from.
    pub source_config: SourceConfig,
    /// 🪣 How they get buffered, named and uploaded.
    pub sink_config: SinkConfig,
    /// ☁️ Which object store receives them. Defaults to the in-memory one.
    #[serde(default)]
    pub store_config: StoreConfig,
    #[serde(default, alias = "supervisor_config")]
    pub runtime: RuntimeConfig,
}

/// 🧵 Knobs for the ingest → archive wiring, not for the sink itself.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// 📬 Records the connector buffer holds before ingest has to wait.
    #[serde(default = "default_queue_capacity", alias = "channel_size")]
    pub queue_capacity: usize,
    /// 📥 Max records the archive side pulls from the connector buffer per `accept`.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// ⏳ How long ingest waits on a full buffer before giving up. Unset = practically forever.
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,
    /// ⏰ How often the archive side checks whether the active buffer got too old.
    #[serde(default = "default_age_check_interval_ms")]
    pub age_check_interval_ms: u64,
}

fn default_queue_capacity() -> usize {
    10
}

fn default_batch_size() -> usize {
    100
}

fn default_age_check_interval_ms() -> u64 {
    1000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            write_timeout_ms: None,
            age_check_interval_ms: default_age_check_interval_ms(),
        }
    }
}

impl RuntimeConfig {
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(crate::connectors::DEFAULT_WRITE_TIMEOUT)
    }

    pub fn age_check_interval(&self) -> Duration {
        Duration::from_millis(self.age_check_interval_ms)
    }
}

impl AppConfig {
    /// ✅ Everything that can be checked before the first record shows up.
    pub fn validate(&self) -> Result<(), SinkError> {
        let sink = &self.sink_config;
        if sink.bucket.trim().is_empty() {
            return Err(SinkError::Configuration("sink bucket must not be empty".to_string()));
        }
        let codec = CodecBackend::from_config(&sink.codec);
        ObjectKeyNamer::from_config(&sink.object_key, Some(codec.name()))?;
        ThresholdOptions::try_from(&sink.threshold)?;
        if !(0.0..=1.0).contains(&sink.upload_retry_jitter) {
            return Err(SinkError::Configuration(format!(
                "upload_retry_jitter must be between 0.0 and 1.0, got {}",
                sink.upload_retry_jitter
            )));
        }
        if self.runtime.queue_capacity == 0 {
            return Err(SinkError::Configuration(
                "runtime queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of hoping.
///
/// 📐 `None` → env vars only. `Some(path)` → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Errors if the config is unparseable or fails `validate()`.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed(ENV_PREFIX).split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables ({ENV_PREFIX}*). \
             The file exists in our hearts, but apparently not on disk.",
            path.display()
        ),
        None => format!(
            "💀 Failed to parse configuration from environment variables ({ENV_PREFIX}*). \
             No file was provided, this one's all on the environment. Classic."
        ),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config
        .validate()
        .context("💀 Configuration parsed fine but makes no sense. Fix it before a single record moves.")?;
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulators::BufferType;
    use crate::codecs::CodecConfig;
    use crate::sink_service::EncodeErrorPolicy;
    use std::fs;

    const MINIMAL: &str = r#"
        [source_config.File]
        file_name = "input.ndjson"

        [sink_config]
        bucket = "archive"

        [sink_config.threshold]
        event_collect_secs = 60
    "#;

    fn write_test_config(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("bkt.toml");
        fs::write(&path, contents).expect("💀 Failed to write test config. The filesystem said 'new phone who dis'.");
        path
    }

    #[test]
    fn the_one_where_a_minimal_file_gets_every_default_it_deserves() {
        let dir = tempfile::tempdir().expect("💀 tempdir");
        let path = write_test_config(&dir, MINIMAL);

        let app_config = load_config(Some(path.as_path())).expect("💀 minimal config should load");

        assert_eq!(app_config.runtime.queue_capacity, 10);
        assert_eq!(app_config.runtime.batch_size, 100);
        assert_eq!(app_config.runtime.write_timeout(), crate::connectors::DEFAULT_WRITE_TIMEOUT);
        assert_eq!(app_config.runtime.age_check_interval(), Duration::from_secs(1));
        assert!(matches!(app_config.store_config, StoreConfig::InMemory));
        let sink = &app_config.sink_config;
        assert_eq!(sink.max_upload_retries, 5);
        assert_eq!(sink.max_connection_retries, 5);
        assert_eq!(sink.upload_retry_delay_ms, 5000);
        assert_eq!(sink.buffer_type, BufferType::InMemory);
        assert_eq!(sink.on_encode_error, EncodeErrorPolicy::Abort);
        assert!(matches!(sink.codec, CodecConfig::Ndjson));
        assert_eq!(sink.threshold.event_count, 0);
        assert_eq!(sink.threshold.maximum_size, bytesize::ByteSize::mb(50));
        assert_eq!(sink.object_key.name_pattern, "events-%{yyyy-MM-dd'T'HH-mm-ss}");
    }

    #[test]
    fn the_one_where_every_section_is_spelled_out() {
        let dir = tempfile::tempdir().expect("💀 tempdir");
        let path = write_test_config(
            &dir,
            r#"
            [runtime]
            channel_size = 4
            batch_size = 16
            write_timeout_ms = 250

            [source_config.InMemory]
            lines = ["one", "two"]

            [store_config.File]
            root_dir = "/tmp/buckets"

            [sink_config]
            bucket = "logs"
            buffer_type = "local_file"
            max_upload_retries = 2
            on_encode_error = "skip"

            [sink_config.object_key]
            path_prefix = "year=%{yyyy}/month=%{MM}/"
            name_pattern = "app-%{HH-mm}"

            [sink_config.codec.raw]
            field = "log"

            [sink_config.threshold]
            event_count = 500
            maximum_size = "1 MiB"
            event_collect_secs = 30
            "#,
        );

        let app_config = load_config(Some(path.as_path())).expect("💀 full config should load");

        assert_eq!(app_config.runtime.queue_capacity, 4);
        assert_eq!(app_config.runtime.batch_size, 16);
        assert_eq!(app_config.runtime.write_timeout(), Duration::from_millis(250));
        match &app_config.store_config {
            StoreConfig::File(file) => assert_eq!(file.root_dir, Path::new("/tmp/buckets")),
            honestly_who_knows => panic!("💀 expected a File store, serde took us to {:?}", honestly_who_knows),
        }
        match &app_config.source_config {
            SourceConfig::InMemory(source) => assert_eq!(source.lines, vec!["one", "two"]),
            honestly_who_knows => panic!("💀 expected an InMemory source, got {:?}", honestly_who_knows),
        }
        let sink = &app_config.sink_config;
        assert_eq!(sink.buffer_type, BufferType::LocalFile);
        assert_eq!(sink.on_encode_error, EncodeErrorPolicy::Skip);
        assert_eq!(sink.threshold.maximum_size, bytesize::ByteSize::mib(1));
        match &sink.codec {
            CodecConfig::Raw { field } => assert_eq!(field, "log"),
            other => panic!("💀 expected the raw codec, got {:?}", other),
        }
    }

    #[test]
    fn the_one_where_two_tokens_in_the_name_never_make_it_past_loading() {
        let dir = tempfile::tempdir().expect("💀 tempdir");
        let path = write_test_config(
            &dir,
            &format!("{MINIMAL}\n[sink_config.object_key]\nname_pattern = \"e-%{{yyyy}}-%{{MM}}\"\n"),
        );

        let err = load_config(Some(path.as_path())).expect_err("💀 two tokens should be refused");

        assert!(format!("{:#}", err).contains("only one date-time token"), "{err:#}");
    }

    #[test]
    fn the_one_where_an_hour_plus_one_second_is_too_patient() {
        let dir = tempfile::tempdir().expect("💀 tempdir");
        let path = write_test_config(
            &dir,
            r#"
            [source_config.File]
            file_name = "input.ndjson"
            [sink_config]
            bucket = "archive"
            [sink_config.threshold]
            event_collect_secs = 3601
            "#,
        );

        let err = load_config(Some(path.as_path())).expect_err("💀 age above one hour should be refused");

        assert!(format!("{:#}", err).contains("at most 3600"), "{err:#}");
    }

    #[test]
    fn the_one_where_validate_catches_the_quiet_mistakes() {
        let dir = tempfile::tempdir().expect("💀 tempdir");
        let path = write_test_config(&dir, MINIMAL);
        let good = load_config(Some(path.as_path())).expect("💀 minimal config should load");

        let mut no_queue = good.clone();
        no_queue.runtime.queue_capacity = 0;
        assert!(matches!(no_queue.validate(), Err(SinkError::Configuration(_))));

        let mut no_bucket = good.clone();
        no_bucket.sink_config.bucket = "  ".to_string();
        assert!(matches!(no_bucket.validate(), Err(SinkError::Configuration(_))));

        let mut wild_jitter = good.clone();
        wild_jitter.sink_config.upload_retry_jitter = 2.5;
        assert!(matches!(wild_jitter.validate(), Err(SinkError::Configuration(_))));

        let mut bad_prefix = good;
        bad_prefix.sink_config.object_key.path_prefix = Some("logs/%{yyyy-AA}/".to_string());
        assert!(matches!(bad_prefix.validate(), Err(SinkError::InvalidPattern { .. })));
    }

    #[test]
    fn the_one_where_env_vars_fill_in_what_the_file_left_out() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "bkt.toml",
                r#"
                [source_config.File]
                file_name = "input.ndjson"
                [sink_config.threshold]
                event_collect_secs = 60
                "#,
            )?;
            jail.set_env("BKT_SINK_CONFIG__BUCKET", "from-env");
            jail.set_env("BKT_RUNTIME__BATCH_SIZE", "7");

            let app_config = load_config(Some(Path::new("bkt.toml"))).map_err(|e| format!("{e:#}"))?;

            assert_eq!(app_config.sink_config.bucket, "from-env");
            assert_eq!(app_config.runtime.batch_size, 7);
            Ok(())
        });
    }
}
