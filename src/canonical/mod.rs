//! Canonical form derivation and content hashing.
//!
//! The canonical form of a manifest document is the document minus runtime
//! noise: the top-level `status`, server-managed metadata fields, and any
//! previously written identity annotations. Excluding the identity
//! annotations is what makes repeated lock runs converge — otherwise the
//! content hash would depend on its own prior value.

use serde_json::{Map, Value};
use serde_yaml::Value as YamlValue;
use sha2::{Digest, Sha256};

use crate::identity::ANNOTATION_PREFIX;

/// Metadata fields that churn with cluster state and never affect identity.
const METADATA_NOISE_FIELDS: &[&str] =
    &["creationTimestamp", "generation", "managedFields", "resourceVersion", "uid"];

/// Derives the canonical form of a parsed manifest document.
///
/// Removes, if present: the top-level `status`; the metadata noise fields;
/// every `metadata.annotations` entry under the identity annotation prefix.
/// If that removal empties the annotations map, the map itself is removed so
/// "never annotated" and "annotations stripped" canonicalize identically.
/// Sequence order is preserved exactly — list position is semantic.
///
/// # Errors
///
/// Returns an error if the document cannot be represented as JSON
/// (e.g. a mapping with a non-string key).
pub fn canonicalize(doc: &YamlValue) -> Result<Value, String> {
    let mut value = serde_json::to_value(doc)
        .map_err(|e| format!("failed to convert document to canonical form: {e}"))?;
    let identity_prefix = format!("{ANNOTATION_PREFIX}/");
    if let Value::Object(root) = &mut value {
        root.remove("status");
        if let Some(Value::Object(metadata)) = root.get_mut("metadata") {
            for field in METADATA_NOISE_FIELDS {
                metadata.remove(*field);
            }
            let drop_annotations = match metadata.get_mut("annotations") {
                Some(Value::Object(annotations)) => {
                    annotations.retain(|k, _| !k.starts_with(&identity_prefix));
                    annotations.is_empty()
                }
                _ => false,
            };
            if drop_annotations {
                metadata.remove("annotations");
            }
        }
    }
    Ok(value)
}

/// Serializes a canonical value to its stable byte form.
///
/// Object keys are sorted lexicographically at every depth; the output uses
/// compact separators and UTF-8, so two semantically equal values always
/// yield identical bytes regardless of original key order.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, String> {
    serde_json::to_vec(&ordered(value))
        .map_err(|e| format!("failed to serialize canonical form: {e}"))
}

/// Lowercase hex SHA-256 digest of the canonical byte form.
///
/// # Errors
///
/// Returns an error if serialization of the canonical form fails.
pub fn content_hash(value: &Value) -> Result<String, String> {
    let bytes = canonical_bytes(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn ordered(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), ordered(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(ordered).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_documents;

    fn doc(yaml: &str) -> YamlValue {
        parse_documents(yaml).unwrap().remove(0)
    }

    #[test]
    fn strips_status_and_metadata_noise() {
        let d = doc(
            "kind: Deployment\nmetadata:\n  name: web\n  resourceVersion: '12345'\n  uid: abc-def\n  generation: 7\n  creationTimestamp: '2024-01-01T00:00:00Z'\n  managedFields: []\nspec:\n  replicas: 3\nstatus:\n  readyReplicas: 3\n",
        );
        let canonical = canonicalize(&d).unwrap();
        assert!(canonical.get("status").is_none());
        let metadata = canonical.get("metadata").unwrap();
        assert!(metadata.get("resourceVersion").is_none());
        assert!(metadata.get("uid").is_none());
        assert!(metadata.get("generation").is_none());
        assert!(metadata.get("creationTimestamp").is_none());
        assert!(metadata.get("managedFields").is_none());
        assert_eq!(metadata.get("name").unwrap(), "web");
    }

    #[test]
    fn strips_identity_annotations_and_empty_map() {
        let with_identity = doc(&format!(
            "kind: Service\nmetadata:\n  name: api\n  annotations:\n    {ANNOTATION_PREFIX}/uri: x\n    {ANNOTATION_PREFIX}/urn: y\n",
        ));
        let never_annotated = doc("kind: Service\nmetadata:\n  name: api\n");
        assert_eq!(
            canonicalize(&with_identity).unwrap(),
            canonicalize(&never_annotated).unwrap()
        );
    }

    #[test]
    fn keeps_foreign_annotations() {
        let d = doc(&format!(
            "kind: Service\nmetadata:\n  name: api\n  annotations:\n    {ANNOTATION_PREFIX}/urn: y\n    team.example.com/owner: payments\n",
        ));
        let canonical = canonicalize(&d).unwrap();
        let annotations = canonical.get("metadata").unwrap().get("annotations").unwrap();
        assert!(annotations.get("team.example.com/owner").is_some());
        assert!(annotations.get(&format!("{ANNOTATION_PREFIX}/urn")).is_none());
    }

    #[test]
    fn hash_is_independent_of_key_order() {
        let a = doc("kind: ConfigMap\nmetadata:\n  name: cfg\ndata:\n  x: '1'\n  y: '2'\n");
        let b = doc("data:\n  y: '2'\n  x: '1'\nmetadata:\n  name: cfg\nkind: ConfigMap\n");
        let ha = content_hash(&canonicalize(&a).unwrap()).unwrap();
        let hb = content_hash(&canonicalize(&b).unwrap()).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn hash_is_sensitive_to_semantic_fields() {
        let a = doc("kind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 3\n");
        let b = doc("kind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 4\n");
        let ha = content_hash(&canonicalize(&a).unwrap()).unwrap();
        let hb = content_hash(&canonicalize(&b).unwrap()).unwrap();
        assert_ne!(ha, hb);
    }

    #[test]
    fn hash_ignores_excluded_fields() {
        let a = doc("kind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 3\n");
        let b = doc(
            "kind: Deployment\nmetadata:\n  name: web\n  resourceVersion: '999'\nspec:\n  replicas: 3\nstatus:\n  readyReplicas: 1\n",
        );
        let ha = content_hash(&canonicalize(&a).unwrap()).unwrap();
        let hb = content_hash(&canonicalize(&b).unwrap()).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn hash_is_sensitive_to_list_order() {
        let a = doc("kind: ConfigMap\nmetadata:\n  name: cfg\nspec:\n  args:\n  - first\n  - second\n");
        let b = doc("kind: ConfigMap\nmetadata:\n  name: cfg\nspec:\n  args:\n  - second\n  - first\n");
        let ha = content_hash(&canonicalize(&a).unwrap()).unwrap();
        let hb = content_hash(&canonicalize(&b).unwrap()).unwrap();
        assert_ne!(ha, hb);
    }

    #[test]
    fn canonical_bytes_sort_keys_with_compact_separators() {
        let d = doc("z: 1\na:\n  d: 4\n  b: 2\n");
        let bytes = canonical_bytes(&canonicalize(&d).unwrap()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"a":{"b":2,"d":4},"z":1}"#);
    }

    #[test]
    fn canonicalize_round_trips_through_serialization() {
        let d = doc(
            "kind: Deployment\nmetadata:\n  name: web\n  labels:\n    app: web\nspec:\n  template:\n    spec:\n      containers:\n      - name: web\n        image: web:1.2.3\n",
        );
        let canonical = canonicalize(&d).unwrap();
        let rendered = serde_yaml::to_string(&canonical).unwrap();
        let reparsed = parse_documents(&rendered).unwrap().remove(0);
        assert_eq!(canonicalize(&reparsed).unwrap(), canonical);
    }

    #[test]
    fn content_hash_is_64_hex_chars() {
        let d = doc("kind: Service\nmetadata:\n  name: api\n");
        let hash = content_hash(&canonicalize(&d).unwrap()).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
