// ai
//! 🏷️ Naming — how a buffer earns its name in the bucket.
//!
//! 🧠 Knowledge graph:
//! - `date_pattern`: the `%{...}` token parser and UTC renderer (`DatePatternEngine`).
//! - `object_key`: composes prefix segments + file name + codec extension (`ObjectKeyNamer`).
//! - Templates are validated once, at construction. Flush time only renders. 🦆

pub mod date_pattern;
pub mod object_key;

pub use date_pattern::{DatePattern, DatePatternEngine, NamingTemplate};
pub use object_key::{DEFAULT_CODEC_FILE_EXTENSION, ObjectKeyConfig, ObjectKeyNamer, codec_extension};
