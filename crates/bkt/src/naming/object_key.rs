// ai
//! 🗝️ ObjectKeyNamer — `events/%{yyyy}/%{MM}/` + `app-%{dd}` + `.ndjson`, rendered at flush time.
//!
//! 🎬 *[a buffer is about to be flushed. it needs a name. it gets three, glued together with slashes.]*
//!
//! 🧠 Knowledge graph:
//! - Prefix: split on `/`, empty segments dropped, each segment is its own template (one token max).
//!   Every rendered segment gets a trailing `/`. No prefix means no leading slash either.
//! - File name: the name template rendered, the `-<epoch millis>-<uuid>` suffix (on by default
//!   in config, off for a bare `ObjectKeyNamer::new`), then `.` + extension.
//! - Extension: the codec name, or `json` when the codec has nothing to say.
//! - A token cannot span a `/`: splitting leaves an unterminated `%{` behind, which validation rejects.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::SinkError;
use crate::naming::date_pattern::NamingTemplate;

/// 📎 What a file ends in when the codec cannot tell us.
pub const DEFAULT_CODEC_FILE_EXTENSION: &str = "json";

const PATH_SEPARATOR: char = '/';

/// 🔧 `[sink_config.object_key]` in TOML.
#[derive(Debug, Deserialize, Clone)]
pub struct ObjectKeyConfig {
    /// 📁 e.g. `"events/%{yyyy}/%{MM}/%{dd}/"`. Optional.
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// 📄 e.g. `"events-%{yyyy-MM-dd'T'HH-mm-ss}"`.
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,
    /// 🎲 Append `-<millis>-<uuid>` so two flushes in the same second never collide.
    /// On unless turned off; without it same-second flushes overwrite each other.
    #[serde(default = "default_unique_suffix")]
    pub unique_suffix: bool,
}

fn default_name_pattern() -> String {
    "events-%{yyyy-MM-dd'T'HH-mm-ss}".to_string()
}

fn default_unique_suffix() -> bool {
    true
}

impl Default for ObjectKeyConfig {
    fn default() -> Self {
        Self {
            path_prefix: None,
            name_pattern: default_name_pattern(),
            unique_suffix: default_unique_suffix(),
        }
    }
}

/// 📎 The codec's name, or the fallback when it is missing or blank.
pub fn codec_extension(codec_name: Option<&str>) -> &str {
    match codec_name {
        Some(name) if !name.trim().is_empty() => name,
        _ => DEFAULT_CODEC_FILE_EXTENSION,
    }
}

/// 🗝️ Pre-validated key composer. Cheap to call per flush, no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeyNamer {
    prefix_segments: Vec<NamingTemplate>,
    name: NamingTemplate,
    extension: String,
    unique_suffix: bool,
}

impl ObjectKeyNamer {
    /// 🏗️ Validate every template now so a bad pattern fails startup, not the first flush.
    pub fn new(
        path_prefix: Option<&str>,
        name_pattern: &str,
        codec_name: Option<&str>,
    ) -> Result<Self, SinkError> {
        let prefix_segments = path_prefix
            .unwrap_or_default()
            .split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(NamingTemplate::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if name_pattern.contains(PATH_SEPARATOR) {
            return Err(SinkError::invalid_pattern(
                name_pattern,
                "the name pattern may not contain '/'; put directories in path_prefix",
            ));
        }
        if name_pattern.trim().is_empty() {
            return Err(SinkError::invalid_pattern(name_pattern, "the name pattern is empty"));
        }
        let name = NamingTemplate::parse(name_pattern)?;

        Ok(Self {
            prefix_segments,
            name,
            extension: codec_extension(codec_name).to_string(),
            unique_suffix: false,
        })
    }

    /// 🏗️ Build from config plus the codec's identifier.
    pub fn from_config(config: &ObjectKeyConfig, codec_name: Option<&str>) -> Result<Self, SinkError> {
        Ok(Self::new(config.path_prefix.as_deref(), &config.name_pattern, codec_name)?
            .with_unique_suffix(config.unique_suffix))
    }

    /// 🎲 Toggle the `-<millis>-<uuid>` suffix on file names.
    pub fn with_unique_suffix(mut self, unique_suffix: bool) -> Self {
        self.unique_suffix = unique_suffix;
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// 📁 Every prefix segment rendered and followed by `/`. Empty when there is no prefix.
    pub fn build_prefix(&self, now: &DateTime<Utc>) -> String {
        self.prefix_segments.iter().fold(String::new(), |mut path, segment| {
            path.push_str(&segment.render(now));
            path.push(PATH_SEPARATOR);
            path
        })
    }

    /// 📄 Rendered name, optional unique suffix, then the extension.
    pub fn build_file_name(&self, now: &DateTime<Utc>) -> String {
        let mut file_name = self.name.render(now);
        if self.unique_suffix {
            file_name.push_str(&format!("-{}-{}", now.timestamp_millis(), Uuid::new_v4()));
        }
        file_name.push('.');
        file_name.push_str(&self.extension);
        file_name
    }

    /// 🗝️ The full key for a flush happening at `now`.
    pub fn generate_key(&self, now: &DateTime<Utc>) -> String {
        let mut key = self.build_prefix(now);
        key.push_str(&self.build_file_name(now));
        key
    }
}
