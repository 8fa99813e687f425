//! Post-query match filtering.
//!
//! Applied by the caller on top of raw search results, not inside the query
//! engine, so scanning stays independent of configurable policy. Name
//! patterns come from a `;`-delimited wildcard preference and are cached
//! until `invalidate` is called; the two accessibility gates are read from
//! the preference source on every use.

use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;

use symdex_api::PreferenceSource;
use symdex_api::models::util::wildcard_regex;
use symdex_api::models::{Accessibility, TypeNameMatch, TypeNameSink};

/// Preference key holding the `;`-delimited type-name filter list.
pub const TYPE_FILTER_PREF: &str = "symdex.typeFilter.enabled";
/// Gate suppressing `NonAccessible` matches when set to [`ENABLED`].
pub const FORBIDDEN_REFERENCE_CHECK: &str = "symdex.forbiddenReferenceCheck";
/// Gate suppressing `Discouraged` matches when set to [`ENABLED`].
pub const DISCOURAGED_REFERENCE_CHECK: &str = "symdex.discouragedReferenceCheck";
pub const ENABLED: &str = "enabled";

pub struct TypeFilter {
    prefs: Arc<dyn PreferenceSource>,
    matchers: RwLock<Option<Arc<Vec<Regex>>>>,
}

impl TypeFilter {
    pub fn new(prefs: Arc<dyn PreferenceSource>) -> Self {
        Self {
            prefs,
            matchers: RwLock::new(None),
        }
    }

    /// Drops the compiled pattern cache; the next use recompiles from the
    /// preference source. Call when the source configuration changed.
    pub fn invalidate(&self) {
        *self.matchers.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Name veto first, then the accessibility gates. Both are independent
    /// vetoes; neither can force-accept.
    pub fn accept(&self, m: &TypeNameMatch) -> bool {
        !self.filtered_by_name(&m.fqn) && !self.filtered_by_accessibility(m.accessibility)
    }

    fn filtered_by_name(&self, fqn: &str) -> bool {
        self.string_matchers().iter().any(|m| m.is_match(fqn))
    }

    fn filtered_by_accessibility(&self, accessibility: Accessibility) -> bool {
        match accessibility {
            Accessibility::NonAccessible => self.gate_enabled(FORBIDDEN_REFERENCE_CHECK),
            Accessibility::Discouraged => self.gate_enabled(DISCOURAGED_REFERENCE_CHECK),
            Accessibility::Accessible => false,
        }
    }

    fn gate_enabled(&self, key: &str) -> bool {
        self.prefs.get(key).is_some_and(|value| value == ENABLED)
    }

    fn string_matchers(&self) -> Arc<Vec<Regex>> {
        if let Some(cached) = self
            .matchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Arc::clone(cached);
        }

        let raw = self.prefs.get(TYPE_FILTER_PREF).unwrap_or_default();
        let compiled = Arc::new(compile_filter_rules(&raw));

        let mut guard = self.matchers.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(guard.get_or_insert(compiled))
    }
}

/// Translates a `;`-delimited wildcard list into anchored matchers. Empty
/// tokens are ignored; no tokens means nothing is filtered by name.
pub fn compile_filter_rules(raw: &str) -> Vec<Regex> {
    raw.split(';')
        .filter(|token| !token.is_empty())
        .filter_map(|token| match Regex::new(&wildcard_regex(token)) {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::debug!(token, "ignoring unparsable filter token: {err}");
                None
            }
        })
        .collect()
}

/// Sink applying the filter and collecting the survivors.
pub struct FilteringCollector {
    filter: Arc<TypeFilter>,
    pub matches: Vec<TypeNameMatch>,
}

impl FilteringCollector {
    pub fn new(filter: Arc<TypeFilter>) -> Self {
        Self {
            filter,
            matches: Vec::new(),
        }
    }
}

impl TypeNameSink for FilteringCollector {
    fn accept(&mut self, m: TypeNameMatch) -> bool {
        if self.filter.accept(&m) {
            self.matches.push(m);
        }
        true
    }
}
