//! Identity derivation for governed manifest objects.
//!
//! Maps a manifest object plus its classification (`platform`, `component`)
//! to a stable identity triple: a content-independent URI, a
//! content-addressed URN embedding the SHA-256 digest, and the digest
//! itself.

use std::path::{Component, Path};

use serde_yaml::Value;

use crate::manifest::{label, object_meta, ObjectMeta};

/// Prefix for all identity annotations and labels written by this tool.
pub const ANNOTATION_PREFIX: &str = "hashlock.dev";
/// Annotation key holding the location URI.
pub const URI_ANNOTATION: &str = "hashlock.dev/uri";
/// Annotation key holding the content-addressed URN.
pub const URN_ANNOTATION: &str = "hashlock.dev/urn";
/// Label key carrying an explicit platform classification.
pub const PLATFORM_LABEL: &str = "hashlock.dev/platform";

/// Platform used when neither a label nor a path heuristic resolves one.
pub const DEFAULT_PLATFORM: &str = "core";

const URI_SCHEME: &str = "hashlock";
const URN_NAMESPACE: &str = "hashlock";

/// The fixed `kind -> component` table. Kinds absent from this table are
/// not governed and are skipped entirely.
const GOVERNED_KINDS: &[(&str, &str)] = &[
    ("ConfigMap", "configmap"),
    ("CronJob", "cronjob"),
    ("DaemonSet", "daemonset"),
    ("Deployment", "deployment"),
    ("Ingress", "ingress"),
    ("Job", "job"),
    ("PersistentVolumeClaim", "pvc"),
    ("Secret", "secret"),
    ("Service", "service"),
    ("ServiceAccount", "serviceaccount"),
    ("StatefulSet", "statefulset"),
];

/// Path segments that indicate shared cluster infrastructure. Objects under
/// these directories default to the shared platform without a warning.
const CORE_PATH_MARKERS: &[&str] = &[
    "argocd",
    "flux",
    "gitops",
    "jenkins",
    "tekton",
    "ci",
    "monitoring",
    "prometheus",
    "grafana",
    "ingress",
    "cert-manager",
    "infra",
    "infrastructure",
];

/// A manifest object subject to identity locking: coordinates plus
/// classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernedObject {
    /// Identifying coordinates from the document metadata.
    pub meta: ObjectMeta,
    /// Platform the object belongs to.
    pub platform: String,
    /// Component class from the governed-kind table.
    pub component: String,
    /// Whether the platform fell back to [`DEFAULT_PLATFORM`] with no label
    /// and no path evidence (reported as a warning).
    pub platform_defaulted: bool,
}

/// The derived identity of a governed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Content-independent logical address.
    pub uri: String,
    /// Content-addressed identifier embedding the SHA-256 digest.
    pub urn: String,
    /// Lowercase hex SHA-256 of the canonical form.
    pub content_hash: String,
}

/// Looks up the component class for a manifest kind.
#[must_use]
pub fn component_for(kind: &str) -> Option<&'static str> {
    GOVERNED_KINDS.iter().find(|(k, _)| *k == kind).map(|(_, c)| *c)
}

/// Classifies a parsed document, returning `None` when it is not governed
/// (unknown kind, or missing `metadata.name`). Not an error.
#[must_use]
pub fn govern(doc: &Value, source: &Path) -> Option<GovernedObject> {
    let meta = object_meta(doc)?;
    let component = component_for(&meta.kind)?;
    let (platform, defaulted) = resolve_platform(label(doc, PLATFORM_LABEL), source);
    Some(GovernedObject {
        meta,
        platform,
        component: component.to_string(),
        platform_defaulted: defaulted,
    })
}

/// Resolves the platform for an object.
///
/// The explicit label wins; otherwise path markers for shared
/// infrastructure map to [`DEFAULT_PLATFORM`]; otherwise the default is
/// used and the second tuple element is `true` so the caller can warn.
#[must_use]
pub fn resolve_platform(platform_label: Option<&str>, source: &Path) -> (String, bool) {
    if let Some(value) = platform_label {
        if !value.is_empty() {
            return (value.to_string(), false);
        }
    }
    for component in source.components() {
        let Component::Normal(part) = component else { continue };
        let part = part.to_string_lossy().to_lowercase();
        for marker in CORE_PATH_MARKERS {
            if part == *marker || part.starts_with(&format!("{marker}-")) {
                return (DEFAULT_PLATFORM.to_string(), false);
            }
        }
    }
    (DEFAULT_PLATFORM.to_string(), true)
}

/// Derives the identity triple for a governed object and its content hash.
#[must_use]
pub fn identity_for(obj: &GovernedObject, content_hash: &str) -> Identity {
    let uri = format!(
        "{URI_SCHEME}://k8s/{}/{}/{}",
        obj.platform, obj.component, obj.meta.name
    );
    let urn = format!(
        "urn:{URN_NAMESPACE}:k8s:{}:{}:{}:sha256-{}",
        obj.platform, obj.component, obj.meta.name, content_hash
    );
    Identity { uri, urn, content_hash: content_hash.to_string() }
}

/// Validates a URN against the fixed identity grammar:
/// `urn:hashlock:k8s:<platform>:<component>:<name>:sha256-<64 hex>` with
/// lowercase hyphen-safe segments.
#[must_use]
pub fn is_valid_urn(urn: &str) -> bool {
    let mut parts = urn.split(':');
    if [parts.next(), parts.next(), parts.next()]
        != [Some("urn"), Some(URN_NAMESPACE), Some("k8s")]
    {
        return false;
    }
    let (Some(platform), Some(component), Some(name), Some(digest)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if parts.next().is_some() {
        return false;
    }
    [platform, component, name].iter().all(|s| is_segment(s))
        && digest
            .strip_prefix("sha256-")
            .is_some_and(|h| h.len() == 64 && h.chars().all(is_lower_hex))
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
}

fn is_lower_hex(c: char) -> bool {
    c.is_ascii_digit() || ('a'..='f').contains(&c)
}
