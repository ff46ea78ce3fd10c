//! Typed access to the metadata fields of a parsed manifest document.

use serde_yaml::{Mapping, Value};

/// Identifying coordinates of a manifest document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// The `apiVersion` field (may be empty for malformed documents).
    pub api_version: String,
    /// The `kind` field.
    pub kind: String,
    /// The `metadata.namespace` field; empty when unset.
    pub namespace: String,
    /// The `metadata.name` field.
    pub name: String,
}

impl ObjectMeta {
    /// Human-readable `namespace/kind/name` (or `kind/name` when
    /// cluster-scoped) for report lines.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            format!("{}/{}", self.kind, self.name)
        } else {
            format!("{}/{}/{}", self.namespace, self.kind, self.name)
        }
    }
}

/// Extracts the identifying coordinates from a parsed document.
///
/// Returns `None` when the document has no `kind` or no `metadata.name`;
/// such documents are never subject to identity locking.
#[must_use]
pub fn object_meta(doc: &Value) -> Option<ObjectMeta> {
    let kind = doc.get("kind")?.as_str()?;
    let metadata = doc.get("metadata")?;
    let name = metadata.get("name")?.as_str()?;
    if kind.is_empty() || name.is_empty() {
        return None;
    }
    let api_version = doc.get("apiVersion").and_then(Value::as_str).unwrap_or("").to_string();
    let namespace =
        metadata.get("namespace").and_then(Value::as_str).unwrap_or("").to_string();
    Some(ObjectMeta {
        api_version,
        kind: kind.to_string(),
        namespace,
        name: name.to_string(),
    })
}

/// Reads a `metadata.annotations` value.
#[must_use]
pub fn annotation<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
    doc.get("metadata")?.get("annotations")?.get(key)?.as_str()
}

/// Reads a `metadata.labels` value.
#[must_use]
pub fn label<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
    doc.get("metadata")?.get("labels")?.get(key)?.as_str()
}

/// Writes an annotation, creating `metadata.annotations` when absent.
///
/// Returns `true` when the stored value actually changed.
///
/// # Errors
///
/// Returns an error when the document, `metadata`, or
/// `metadata.annotations` is present but not a mapping.
pub fn set_annotation(doc: &mut Value, key: &str, value: &str) -> Result<bool, String> {
    if annotation(doc, key) == Some(value) {
        return Ok(false);
    }
    let Value::Mapping(root) = doc else {
        return Err("document is not a mapping".to_string());
    };
    let metadata = root
        .entry(Value::String("metadata".to_string()))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if metadata.is_null() {
        *metadata = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(metadata) = metadata else {
        return Err("metadata is not a mapping".to_string());
    };
    let annotations = metadata
        .entry(Value::String("annotations".to_string()))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if annotations.is_null() {
        *annotations = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(annotations) = annotations else {
        return Err("metadata.annotations is not a mapping".to_string());
    };
    annotations.insert(Value::String(key.to_string()), Value::String(value.to_string()));
    Ok(true)
}
