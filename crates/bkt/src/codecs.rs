// ai
//! 🧬 Codecs — one event in, one chunk of bytes out.
//!
//! 🎬 *[an Event stands at the edge of the buffer. it must become bytes to enter.]*
//! *[the codec hands it a newline. "you'll need this where you're going."]*
//!
//! 🧠 Knowledge graph:
//! - `Codec` trait: `name()` doubles as the default file extension, `encode()` is per record.
//! - Every codec emits newline-terminated output, so memory and staging-file buffers
//!   produce byte-identical objects.
//! - `CodecBackend` is the enum dispatcher, same casting-agency pattern as the stores and buffers.
//! - `CodecConfig` is co-located here: `codec = "ndjson"` or `[sink_config.codec.raw] field = "message"`.

use serde::Deserialize;

use crate::common::{Event, MESSAGE_FIELD};
use crate::error::SinkError;

/// 🧬 Encode one record. Pure, no I/O.
pub trait Codec: std::fmt::Debug + Send + Sync {
    /// 🏷️ Identifier, also used as the object's file extension.
    fn name(&self) -> &'static str;
    /// 📦 Bytes for exactly one record, newline included.
    fn encode(&self, event: &Event) -> Result<Vec<u8>, SinkError>;
}

/// 🔧 `codec` in TOML. Defaults to ndjson.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodecConfig {
    #[default]
    Ndjson,
    /// 📜 Write one string field per line, nothing else.
    Raw {
        #[serde(default = "default_raw_field")]
        field: String,
    },
}

fn default_raw_field() -> String {
    MESSAGE_FIELD.to_string()
}

/// 📄 One JSON document per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonCodec;

impl Codec for NdjsonCodec {
    fn name(&self) -> &'static str {
        "ndjson"
    }

    fn encode(&self, event: &Event) -> Result<Vec<u8>, SinkError> {
        let mut bytes = serde_json::to_vec(&event.data).map_err(|e| SinkError::Encoding {
            codec: self.name(),
            reason: e.to_string(),
        })?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// 📜 Pulls one string field out of every event. Plain-text log files, basically.
#[derive(Debug, Clone)]
pub struct RawFieldCodec {
    field: String,
}

impl RawFieldCodec {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl Codec for RawFieldCodec {
    fn name(&self) -> &'static str {
        "log"
    }

    fn encode(&self, event: &Event) -> Result<Vec<u8>, SinkError> {
        let text = match event.get(&self.field) {
            Some(serde_json::Value::String(text)) => text,
            Some(other) => {
                return Err(SinkError::Encoding {
                    codec: self.name(),
                    reason: format!("field '{}' is not a string (found {other})", self.field),
                });
            }
            None => {
                return Err(SinkError::Encoding {
                    codec: self.name(),
                    reason: format!("field '{}' is missing", self.field),
                });
            }
        };
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        if !text.ends_with('\n') {
            bytes.push(b'\n');
        }
        Ok(bytes)
    }
}

/// 🎭 The configured codec, dispatched by variant.
#[derive(Debug, Clone)]
pub enum CodecBackend {
    Ndjson(NdjsonCodec),
    Raw(RawFieldCodec),
}

impl CodecBackend {
    pub fn from_config(config: &CodecConfig) -> Self {
        match config {
            CodecConfig::Ndjson => CodecBackend::Ndjson(NdjsonCodec),
            CodecConfig::Raw { field } => CodecBackend::Raw(RawFieldCodec::new(field.clone())),
        }
    }
}

impl Codec for CodecBackend {
    fn name(&self) -> &'static str {
        match self {
            CodecBackend::Ndjson(codec) => codec.name(),
            CodecBackend::Raw(codec) => codec.name(),
        }
    }

    fn encode(&self, event: &Event) -> Result<Vec<u8>, SinkError> {
        match self {
            CodecBackend::Ndjson(codec) => codec.encode(event),
            CodecBackend::Raw(codec) => codec.encode(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, serde::Deserialize)]
    struct Holder {
        #[serde(default)]
        codec: CodecConfig,
    }

    #[test]
    fn the_one_where_ndjson_adds_exactly_one_newline() {
        let bytes = NdjsonCodec
            .encode(&Event::new(json!({"a": 1})))
            .expect("💀 encode");
        assert_eq!(bytes, b"{\"a\":1}\n");
    }

    #[test]
    fn the_one_where_raw_pulls_out_the_message() {
        let codec = RawFieldCodec::new("message");
        let bytes = codec
            .encode(&Event::from_line("GET /healthz 200"))
            .expect("💀 encode");
        assert_eq!(bytes, b"GET /healthz 200\n");
    }

    #[test]
    fn the_one_where_raw_refuses_missing_or_non_string_fields() {
        let codec = RawFieldCodec::new("message");
        let missing = codec.encode(&Event::new(json!({"other": "x"})));
        assert!(matches!(missing, Err(SinkError::Encoding { codec: "log", .. })));
        let wrong_type = codec.encode(&Event::new(json!({"message": 5})));
        assert!(matches!(wrong_type, Err(SinkError::Encoding { .. })));
    }

    #[test]
    fn the_one_where_config_picks_the_codec() {
        let holder: Holder = toml::from_str("").expect("💀 parse");
        assert_eq!(CodecBackend::from_config(&holder.codec).name(), "ndjson");

        let holder: Holder = toml::from_str(r#"codec = "ndjson""#).expect("💀 parse");
        assert_eq!(holder.codec, CodecConfig::Ndjson);

        let holder: Holder = toml::from_str("[codec.raw]\nfield = \"line\"").expect("💀 parse");
        assert_eq!(holder.codec, CodecConfig::Raw { field: "line".to_string() });
        assert_eq!(CodecBackend::from_config(&holder.codec).name(), "log");
    }
}
