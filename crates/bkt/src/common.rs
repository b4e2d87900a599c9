// ai
//! 📦 Common data structures — the humble record that everything else exists to move.
//!
//! 🎬 COLD OPEN — INT. INGEST PIPELINE — 3:12 AM
//!
//! A line of JSON arrives. It does not know it will be encoded, buffered, named after
//! today's date and shipped to a bucket in another time zone. It only knows it is an
//! [`Event`]. Sometimes that is enough. 🦆

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 🏷️ The key raw, non-JSON lines get stashed under. Logs have feelings too.
pub const MESSAGE_FIELD: &str = "message";

/// 🎯 One record flowing through the sink: a JSON document and nothing more.
///
/// `#[serde(transparent)]` because an `Event` on the wire is just its data.
/// No envelope. No metadata. The codec decides what the bytes look like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Event {
    pub data: Value,
}

impl Event {
    /// 🏗️ Wrap an existing JSON value.
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 📄 Build an event from one line of input.
    ///
    /// A line that parses as a JSON object becomes that object. Anything else
    /// (plain text, a bare number, half a JSON doc) is wrapped as `{"message": "<line>"}`
    /// so nothing gets dropped just for being informal.
    pub fn from_line(line: &str) -> Self {
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(object)) => Self::new(Value::Object(object)),
            _ => {
                // -- 🧥 not an object? it gets a coat and a name tag
                let mut wrapper = Map::with_capacity(1);
                wrapper.insert(MESSAGE_FIELD.to_string(), Value::String(line.to_string()));
                Self::new(Value::Object(wrapper))
            }
        }
    }

    /// 🔍 Peek at a top-level field, if the event is an object and has it.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

impl From<Value> for Event {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_json_objects_walk_in_unchanged() {
        let event = Event::from_line(r#"{"level":"info","n":1}"#);
        assert_eq!(event.data, json!({"level": "info", "n": 1}));
        assert_eq!(event.get("n"), Some(&json!(1)));
    }

    #[test]
    fn the_one_where_plain_text_gets_a_message_coat() {
        let event = Event::from_line("GET /healthz 200");
        assert_eq!(event.data, json!({"message": "GET /healthz 200"}));

        // -- 🔢 bare scalars are valid JSON but not documents, so they get the coat too
        let event = Event::from_line("42");
        assert_eq!(event.data, json!({"message": "42"}));
    }

    #[test]
    fn the_one_where_events_serialize_as_their_data() {
        let event = Event::new(json!({"a": true}));
        let the_wire_format = serde_json::to_string(&event).expect("💀 serialize");
        assert_eq!(the_wire_format, r#"{"a":true}"#);
    }
}
