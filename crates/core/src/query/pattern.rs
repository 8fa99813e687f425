use regex::{Regex, RegexBuilder};

use symdex_api::models::util::wildcard_regex;
use symdex_api::models::{MatchMode, MatchRule};

use crate::error::{Result, SymdexError};

/// Compiled type-name pattern. A pattern containing `.` targets the
/// fully-qualified name, otherwise the simple name.
pub struct TypeNamePattern {
    qualified: bool,
    matcher: Matcher,
}

enum Matcher {
    Exact { text: String, case_sensitive: bool },
    Prefix { text: String, case_sensitive: bool },
    Wildcard(Regex),
}

impl TypeNamePattern {
    /// Validates and compiles before any scanning starts; a malformed
    /// pattern is rejected synchronously.
    pub fn compile(pattern: &str, rule: MatchRule) -> Result<Self> {
        let qualified = pattern.contains('.');
        let matcher = match rule.mode {
            MatchMode::Exact => Matcher::Exact {
                text: pattern.to_string(),
                case_sensitive: rule.case_sensitive,
            },
            MatchMode::Prefix => Matcher::Prefix {
                text: pattern.to_string(),
                case_sensitive: rule.case_sensitive,
            },
            MatchMode::Pattern => {
                let regex = RegexBuilder::new(&wildcard_regex(pattern))
                    .case_insensitive(!rule.case_sensitive)
                    .build()
                    .map_err(|e| SymdexError::InvalidPattern(format!("{pattern}: {e}")))?;
                Matcher::Wildcard(regex)
            }
        };
        Ok(Self { qualified, matcher })
    }

    pub fn matches(&self, simple_name: &str, fqn: &str) -> bool {
        let candidate = if self.qualified { fqn } else { simple_name };
        match &self.matcher {
            Matcher::Exact {
                text,
                case_sensitive: true,
            } => candidate == text,
            Matcher::Exact {
                text,
                case_sensitive: false,
            } => candidate.eq_ignore_ascii_case(text),
            Matcher::Prefix {
                text,
                case_sensitive: true,
            } => candidate.starts_with(text.as_str()),
            Matcher::Prefix {
                text,
                case_sensitive: false,
            } => candidate
                .get(..text.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(text)),
            Matcher::Wildcard(regex) => regex.is_match(candidate),
        }
    }
}
