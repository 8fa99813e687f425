use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

/// Per-symbol classification governing result suppression under policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessibility {
    Accessible,
    Discouraged,
    NonAccessible,
}

/// Class-file modifier bits carried verbatim on entries.
pub mod modifiers {
    pub const PUBLIC: u16 = 0x0001;
    pub const FINAL: u16 = 0x0010;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
}

/// One declared type inside a container.
///
/// Entries for a container are created and replaced atomically as a unit;
/// no partial per-container state is ever queryable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub simple_name: String,
    pub package: String,
    /// Enclosing type names, outermost first. Empty for top-level types.
    pub enclosing: Vec<String>,
    pub kind: TypeKind,
    pub modifiers: u16,
    pub accessibility: Accessibility,
    /// Fully-qualified names of the direct supertypes (extends + implements).
    pub super_types: Vec<String>,
    /// Path of the declaring member inside the container.
    pub member_path: String,
}

impl TypeEntry {
    /// Fully-qualified dotted name, `package.Enclosing.Simple`.
    pub fn fqn(&self) -> String {
        let mut out = String::with_capacity(
            self.package.len() + self.simple_name.len() + self.enclosing.len() * 8 + 2,
        );
        if !self.package.is_empty() {
            out.push_str(&self.package);
            out.push('.');
        }
        for enc in &self.enclosing {
            out.push_str(enc);
            out.push('.');
        }
        out.push_str(&self.simple_name);
        out
    }
}

/// Read-only projection of one entry streamed to search sinks, pre-filter.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNameMatch {
    pub fqn: String,
    pub simple_name: String,
    pub package: String,
    pub kind: TypeKind,
    pub modifiers: u16,
    pub accessibility: Accessibility,
    pub container_key: String,
    pub member_path: String,
}

impl TypeNameMatch {
    pub fn from_entry(entry: &TypeEntry, container_key: &str) -> Self {
        Self {
            fqn: entry.fqn(),
            simple_name: entry.simple_name.clone(),
            package: entry.package.clone(),
            kind: entry.kind,
            modifiers: entry.modifiers,
            accessibility: entry.accessibility,
            container_key: container_key.to_string(),
            member_path: entry.member_path.clone(),
        }
    }
}
