// ai
//! 📂 FileSource — one line in, one event out.
//!
//! The disk was quiet. Too quiet. A lone process had been asked to read a file, line by line,
//! and hand the lines to a connector in tidy batches. Some lines were JSON objects. Some were
//! plain text from a log nobody formatted. All of them became events. 🦆
//!
//! 🚰 File → BufReader → `Event::from_line` → batch (capped by docs AND bytes) → connector
//! ⚠️ Blank lines are skipped. A trailing `\r\n` is trimmed like a `\n`.
//! ⚠️ Bytes that are not UTF-8 become `U+FFFD` with a warning; one bad line never ends the run.

use std::borrow::Cow;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, trace, warn};

use crate::common::Event;
use crate::sources::{CommonSourceConfig, Source};

/// 🔧 `[source_config.File]` in TOML. Lives next to the source that reads it.
#[derive(Debug, Deserialize, Clone)]
pub struct FileSourceConfig {
    pub file_name: String,
    #[serde(default)]
    pub common_config: CommonSourceConfig,
}

pub struct FileSource {
    reader: BufReader<File>,
    config: FileSourceConfig,
    lines_read: u64,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("config", &self.config)
            .field("lines_read", &self.lines_read)
            .finish()
    }
}

impl FileSource {
    pub async fn new(config: FileSourceConfig) -> Result<Self> {
        let file = File::open(&config.file_name).await.with_context(|| {
            format!(
                "💀 The door to '{}' would not budge. It might not exist, or we might not be allowed in.",
                config.file_name
            )
        })?;
        debug!("📂 reading events from '{}'", config.file_name);
        Ok(Self {
            reader: BufReader::new(file),
            config,
            lines_read: 0,
        })
    }
}

#[async_trait]
impl Source for FileSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<Event>>> {
        let limits = &self.config.common_config;
        let mut batch = Vec::with_capacity(limits.max_batch_size_docs.min(1024));
        let mut bytes_in_batch = 0usize;
        let mut line = Vec::new();

        while batch.len() < limits.max_batch_size_docs.max(1) && bytes_in_batch < limits.max_batch_size_bytes {
            line.clear();
            let bytes_read = self
                .reader
                .read_until(b'\n', &mut line)
                .await
                .with_context(|| format!("💀 reading line {} of '{}'", self.lines_read + 1, self.config.file_name))?;
            if bytes_read == 0 {
                break;
            }
            self.lines_read += 1;
            let text = String::from_utf8_lossy(&line);
            if let Cow::Owned(_) = text {
                warn!(
                    "⚠️ line {} of '{}' is not valid UTF-8; bad bytes replaced with U+FFFD",
                    self.lines_read, self.config.file_name
                );
            }
            let trimmed = text.trim_end_matches(['\n', '\r']);
            if trimmed.trim().is_empty() {
                continue;
            }
            bytes_in_batch += bytes_read;
            batch.push(Event::from_line(trimmed));
        }

        trace!("📖 hauled {} events ({} bytes) out of the file", batch.len(), bytes_in_batch);
        Ok(if batch.is_empty() { None } else { Some(batch) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn source_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("💀 temp file");
        file.write_all(contents.as_bytes()).expect("💀 write");
        file
    }

    fn config_for(file: &tempfile::NamedTempFile, docs: usize, bytes: usize) -> FileSourceConfig {
        FileSourceConfig {
            file_name: file.path().display().to_string(),
            common_config: CommonSourceConfig {
                max_batch_size_docs: docs,
                max_batch_size_bytes: bytes,
            },
        }
    }

    #[tokio::test]
    async fn the_one_where_lines_become_events_in_doc_sized_batches() {
        let file = source_file("{\"n\":1}\nplain text\r\n\n{\"n\":3}\n");
        let mut source = FileSource::new(config_for(&file, 2, 1 << 20)).await.expect("💀 open");

        let first = source.next_batch().await.expect("💀 read").expect("💀 some");
        assert_eq!(
            first,
            vec![Event::new(json!({"n": 1})), Event::new(json!({"message": "plain text"}))]
        );
        let second = source.next_batch().await.expect("💀 read").expect("💀 some");
        assert_eq!(second, vec![Event::new(json!({"n": 3}))]);
        assert!(source.next_batch().await.expect("💀 read").is_none());
    }

    #[tokio::test]
    async fn the_one_where_a_line_of_broken_utf8_does_not_end_the_run() {
        let mut file = tempfile::NamedTempFile::new().expect("💀 temp file");
        file.write_all(b"before\nbad \xff\xfe bytes\nafter\n").expect("💀 write");
        let mut source = FileSource::new(config_for(&file, 100, 1 << 20)).await.expect("💀 open");

        let batch = source.next_batch().await.expect("💀 a bad line is not fatal").expect("💀 some");

        assert_eq!(
            batch,
            vec![
                Event::from_line("before"),
                Event::from_line("bad \u{FFFD}\u{FFFD} bytes"),
                Event::from_line("after"),
            ]
        );
        assert!(source.next_batch().await.expect("💀 read").is_none());
    }

    #[tokio::test]
    async fn the_one_where_the_byte_cap_ends_a_batch_early() {
        let file = source_file("aaaaaaaaaa\nbbbbbbbbbb\ncccccccccc\n");
        let mut source = FileSource::new(config_for(&file, 100, 15)).await.expect("💀 open");

        let first = source.next_batch().await.expect("💀 read").expect("💀 some");
        assert_eq!(first.len(), 2);
        let second = source.next_batch().await.expect("💀 read").expect("💀 some");
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_a_missing_file_explains_itself() {
        let outcome = FileSource::new(FileSourceConfig {
            file_name: "/definitely/not/here.ndjson".to_string(),
            common_config: CommonSourceConfig::default(),
        })
        .await;
        let message = format!("{:#}", outcome.expect_err("💀 should fail"));
        assert!(message.contains("/definitely/not/here.ndjson"));
    }
}
