// ai
//! 📦 CommonSourceConfig — the batch-size knobs every source shares.
//!
//! 🧠 Knowledge graph:
//! - Embedded in `FileSourceConfig` and `InMemorySourceConfig` as `common_config`.
//! - `max_batch_size_docs`: events per batch handed to the connector.
//! - `max_batch_size_bytes`: raw input bytes per batch, so one fat line cannot balloon a batch.

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CommonSourceConfig {
    #[serde(default = "default_max_batch_size_docs")]
    pub max_batch_size_docs: usize,
    #[serde(default = "default_max_batch_size_bytes")]
    pub max_batch_size_bytes: usize,
}

// -- 📦 a thousand events per batch keeps connector writes small and steady
fn default_max_batch_size_docs() -> usize {
    1000
}

fn default_max_batch_size_bytes() -> usize {
    1024 * 1024
} // -- 1MB

impl Default for CommonSourceConfig {
    fn default() -> Self {
        Self {
            max_batch_size_docs: default_max_batch_size_docs(),
            max_batch_size_bytes: default_max_batch_size_bytes(),
        }
    }
}
