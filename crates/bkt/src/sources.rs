// ai
//! 🚰 Sources — where the ingest pipeline gets its records.
//!
//! 🎭 Pattern: trait → concrete impls (`FileSource`, `InMemorySource`) → `SourceBackend` enum.
//! The source worker only ever talks to the enum. It does not care whether the records came
//! from a file on disk or a list in a TOML file. Ignorance is a feature. 🦆
//!
//! # Contract 📜
//! - `next_batch` returns `Ok(Some(events))` while there is data, `Ok(None)` at EOF.
//! - A batch is never empty; a source with nothing left says `None`.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::common::Event;

pub mod common_config;
pub mod file_source;
pub mod in_mem_source;

pub use common_config::CommonSourceConfig;
pub use file_source::{FileSource, FileSourceConfig};
pub use in_mem_source::{InMemorySource, InMemorySourceConfig};

/// 🚰 Something that yields batches of events until it runs dry.
#[async_trait]
pub trait Source: std::fmt::Debug + Send {
    async fn next_batch(&mut self) -> Result<Option<Vec<Event>>>;
}

/// 🔧 `[source_config.*]` in TOML.
#[derive(Debug, Deserialize, Clone)]
pub enum SourceConfig {
    File(FileSourceConfig),
    InMemory(InMemorySourceConfig),
}

/// 🎭 The configured source.
#[derive(Debug)]
pub enum SourceBackend {
    File(FileSource),
    InMemory(InMemorySource),
}

impl SourceBackend {
    pub async fn from_config(config: &SourceConfig) -> Result<Self> {
        Ok(match config {
            SourceConfig::File(file_config) => SourceBackend::File(FileSource::new(file_config.clone()).await?),
            SourceConfig::InMemory(mem_config) => SourceBackend::InMemory(InMemorySource::new(mem_config.clone())),
        })
    }
}

#[async_trait]
impl Source for SourceBackend {
    async fn next_batch(&mut self) -> Result<Option<Vec<Event>>> {
        match self {
            SourceBackend::File(source) => source.next_batch().await,
            SourceBackend::InMemory(source) => source.next_batch().await,
        }
    }
}
