pub mod container;
pub mod entry;
pub mod query;
pub mod util;

pub use container::{AccessRule, ContainerRef};
pub use entry::{Accessibility, TypeEntry, TypeKind, TypeNameMatch, modifiers};
pub use query::{
    MatchMode, MatchRule, R_CASE_SENSITIVE, R_EXACT_MATCH, R_PATTERN_MATCH, R_PREFIX_MATCH,
    Readiness, SearchScope, TypeKindFilter, TypeNameSink, VecSink, WaitPolicy, WorkspaceScope,
};
