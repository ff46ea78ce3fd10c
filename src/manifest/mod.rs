//! Manifest document model.
//!
//! Multi-document YAML parsing and rendering plus typed access to the
//! metadata fields the identity lock cares about. Documents are held as
//! `serde_yaml::Value` so arbitrary `spec` payloads round-trip untouched.

mod document;
mod object;

pub use document::{parse_documents, render_documents, sort_keys};
pub use object::{annotation, label, object_meta, set_annotation, ObjectMeta};
