// ai
//! 🧠 InMemorySource — events straight out of the config file. No disk, no network, no drama.
//!
//! Handy for demos and end-to-end tests: list some lines in `[source_config.InMemory]`
//! and they come out as events, in order, `max_batch_size_docs` at a time.
//! With no lines configured it falls back to four tiny sample docs, `{"doc":1}` through `{"doc":4}`.

use std::collections::VecDeque;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::common::Event;
use crate::sources::{CommonSourceConfig, Source};

/// 🔧 `[source_config.InMemory]` in TOML.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct InMemorySourceConfig {
    /// 📄 Each entry is one input line: a JSON object or plain text.
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub common_config: CommonSourceConfig,
}

fn sample_lines() -> Vec<String> {
    (1..=4).map(|n| format!(r#"{{"doc":{n}}}"#)).collect()
}

#[derive(Debug)]
pub struct InMemorySource {
    pending: VecDeque<Event>,
    batch_size: usize,
}

impl InMemorySource {
    pub fn new(config: InMemorySourceConfig) -> Self {
        let lines = if config.lines.is_empty() {
            sample_lines()
        } else {
            config.lines
        };
        Self {
            pending: lines.iter().map(|line| Event::from_line(line)).collect(),
            batch_size: config.common_config.max_batch_size_docs.max(1),
        }
    }
}

#[async_trait]
impl Source for InMemorySource {
    async fn next_batch(&mut self) -> Result<Option<Vec<Event>>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let take = self.batch_size.min(self.pending.len());
        Ok(Some(self.pending.drain(..take).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn the_one_where_the_sample_docs_show_up_when_nothing_is_configured() {
        let mut source = InMemorySource::new(InMemorySourceConfig::default());
        let batch = source.next_batch().await.expect("💀 read").expect("💀 some");
        assert_eq!(batch.len(), 4);
        assert_eq!(batch[0], Event::new(json!({"doc": 1})));
        assert!(source.next_batch().await.expect("💀 read").is_none());
    }

    #[tokio::test]
    async fn the_one_where_configured_lines_come_out_in_order_and_in_batches() {
        let mut source = InMemorySource::new(InMemorySourceConfig {
            lines: vec!["a".into(), "b".into(), "c".into()],
            common_config: CommonSourceConfig {
                max_batch_size_docs: 2,
                ..CommonSourceConfig::default()
            },
        });
        let first = source.next_batch().await.expect("💀 read").expect("💀 some");
        assert_eq!(first, vec![Event::from_line("a"), Event::from_line("b")]);
        let second = source.next_batch().await.expect("💀 read").expect("💀 some");
        assert_eq!(second, vec![Event::from_line("c")]);
        assert!(source.next_batch().await.expect("💀 read").is_none());
    }
}
