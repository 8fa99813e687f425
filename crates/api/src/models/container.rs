use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::entry::Accessibility;

/// Identity of one indexable archive on the classpath.
///
/// Captured once when the container is discovered; the fingerprint pins the
/// content version (size + mtime hash or similar) the caller observed. Two
/// refs with equal paths but different fingerprints describe two versions of
/// the same container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerRef {
    pub path: PathBuf,
    pub fingerprint: u64,
    /// Logical index identity this container belongs to, if any. A shared
    /// index binding for the same key takes over read resolution for the
    /// containers its artifact covers.
    pub logical_key: Option<String>,
    /// Ordered accessibility rules; first match on a fully-qualified name
    /// wins, no match means `Accessible`.
    pub access_rules: Vec<AccessRule>,
}

impl ContainerRef {
    pub fn new(path: impl Into<PathBuf>, fingerprint: u64) -> Self {
        Self {
            path: path.into(),
            fingerprint,
            logical_key: None,
            access_rules: Vec::new(),
        }
    }

    pub fn with_logical_key(mut self, key: impl Into<String>) -> Self {
        self.logical_key = Some(key.into());
        self
    }

    pub fn with_access_rules(mut self, rules: Vec<AccessRule>) -> Self {
        self.access_rules = rules;
        self
    }

    /// Canonical store key for this container.
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessRule {
    /// `*`/`?` wildcard pattern over fully-qualified type names.
    pub pattern: String,
    pub kind: Accessibility,
}

impl AccessRule {
    pub fn new(pattern: impl Into<String>, kind: Accessibility) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
        }
    }
}
