//! Multi-document YAML parsing and deterministic rendering.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Parses a (possibly multi-document) YAML string into its documents.
///
/// Empty documents (blank segments between separators) are dropped.
///
/// # Errors
///
/// Returns an error naming the failing document index when any document
/// is malformed YAML.
pub fn parse_documents(content: &str) -> Result<Vec<Value>, String> {
    let mut docs = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value =
            Value::deserialize(document).map_err(|e| format!("document {index}: {e}"))?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

/// Renders documents back to a single YAML string.
///
/// Every document is prefixed with an explicit `---` separator and all
/// mappings are rendered with lexicographically sorted keys, so the output
/// is byte-stable across repeated parse/render cycles.
///
/// # Errors
///
/// Returns an error if any document fails to serialize.
pub fn render_documents(docs: &[Value]) -> Result<String, String> {
    let mut out = String::new();
    for doc in docs {
        let rendered = serde_yaml::to_string(&sort_keys(doc))
            .map_err(|e| format!("failed to render document: {e}"))?;
        out.push_str("---\n");
        out.push_str(&rendered);
    }
    Ok(out)
}

/// Returns a copy of `value` with every mapping's keys sorted.
///
/// Sequence order is preserved exactly; only mapping key order changes.
#[must_use]
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(&Value, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| key_text(k));
            let mut sorted = Mapping::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), sort_keys(v));
            }
            Value::Mapping(sorted)
        }
        Value::Sequence(items) => Value::Sequence(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Sort key for a mapping key. Non-string keys fall back to their YAML form.
fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}
