use crate::record::EnrichedRecord;
use serde_json::{json, Map, Value};

/// Renders an [`EnrichedRecord`] into the serialized form a sink stores.
///
/// Formatting is pure: the same record always yields the same string.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &EnrichedRecord) -> String;
}

/// Human-readable layout:
/// `<timestamp> <level> [<service>] <message>` with a
/// `\nStacktrace: <trace>` block when the record carries a stacktrace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, record: &EnrichedRecord) -> String {
        let mut line = format!(
            "{} {} [{}] {}",
            record.timestamp_string(),
            record.level,
            record.service,
            record.message
        );
        if let Some(trace) = record.stacktrace() {
            line.push_str("\nStacktrace: ");
            line.push_str(&trace);
        }
        line
    }
}

/// Flat JSON object: every entry of `fields` sits next to `timestamp`,
/// `level`, `message` and `service` at the top level.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn to_value(&self, record: &EnrichedRecord) -> Value {
        let mut object: Map<String, Value> = record
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        // Reserved keys overwrite colliding fields.
        object.insert("timestamp".into(), Value::String(record.timestamp_string()));
        object.insert("level".into(), json!(record.level));
        object.insert("message".into(), Value::String(record.message.clone()));
        object.insert("service".into(), Value::String(record.service.to_string()));

        Value::Object(object)
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &EnrichedRecord) -> String {
        self.to_value(record).to_string()
    }
}
