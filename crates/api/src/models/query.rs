use crate::error::{ApiError, ApiResult};

use super::container::ContainerRef;
use super::entry::{TypeKind, TypeNameMatch};

/// Match-rule bits accepted by the query surface. Exact match is the
/// zero value; prefix and pattern are mutually exclusive refinements.
pub const R_EXACT_MATCH: u32 = 0x0000;
pub const R_PREFIX_MATCH: u32 = 0x0001;
pub const R_PATTERN_MATCH: u32 = 0x0002;
pub const R_CASE_SENSITIVE: u32 = 0x0008;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Prefix,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRule {
    pub mode: MatchMode,
    pub case_sensitive: bool,
}

impl MatchRule {
    pub fn exact() -> Self {
        Self {
            mode: MatchMode::Exact,
            case_sensitive: false,
        }
    }

    pub fn prefix() -> Self {
        Self {
            mode: MatchMode::Prefix,
            case_sensitive: false,
        }
    }

    pub fn pattern() -> Self {
        Self {
            mode: MatchMode::Pattern,
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Decode a caller-supplied bitmask, rejecting unknown bits and the
    /// prefix+pattern combination before any scan starts.
    pub fn from_bits(bits: u32) -> ApiResult<Self> {
        const KNOWN: u32 = R_PREFIX_MATCH | R_PATTERN_MATCH | R_CASE_SENSITIVE;
        if bits & !KNOWN != 0 {
            return Err(ApiError::InvalidMatchRule(bits));
        }
        let mode = match (bits & R_PREFIX_MATCH != 0, bits & R_PATTERN_MATCH != 0) {
            (false, false) => MatchMode::Exact,
            (true, false) => MatchMode::Prefix,
            (false, true) => MatchMode::Pattern,
            (true, true) => return Err(ApiError::InvalidMatchRule(bits)),
        };
        Ok(Self {
            mode,
            case_sensitive: bits & R_CASE_SENSITIVE != 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKindFilter {
    Class,
    Interface,
    Enum,
    Annotation,
    Any,
}

impl TypeKindFilter {
    pub fn admits(&self, kind: TypeKind) -> bool {
        match self {
            TypeKindFilter::Class => kind == TypeKind::Class,
            TypeKindFilter::Interface => kind == TypeKind::Interface,
            TypeKindFilter::Enum => kind == TypeKind::Enum,
            TypeKindFilter::Annotation => kind == TypeKind::Annotation,
            TypeKindFilter::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    WaitUntilReady,
    DoNotWait,
}

/// Outcome of a readiness wait. Timing out is a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Predicate restricting which containers' entries a query sees.
/// Supplied per query, never persisted.
pub trait SearchScope: Send + Sync {
    fn contains(&self, container: &ContainerRef) -> bool;
}

/// Scope admitting every container.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkspaceScope;

impl SearchScope for WorkspaceScope {
    fn contains(&self, _container: &ContainerRef) -> bool {
        true
    }
}

/// Push-style result sink. Returning `false` cancels the scan; no further
/// results are delivered after that.
pub trait TypeNameSink {
    fn accept(&mut self, m: TypeNameMatch) -> bool;
}

impl<F> TypeNameSink for F
where
    F: FnMut(TypeNameMatch) -> bool,
{
    fn accept(&mut self, m: TypeNameMatch) -> bool {
        self(m)
    }
}

/// Sink collecting every offered match, never cancelling.
#[derive(Debug, Default)]
pub struct VecSink {
    pub matches: Vec<TypeNameMatch>,
}

impl TypeNameSink for VecSink {
    fn accept(&mut self, m: TypeNameMatch) -> bool {
        self.matches.push(m);
        true
    }
}
