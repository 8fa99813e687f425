/// Read-only key/value configuration lookup consulted by the match filter.
///
/// An unreachable or empty source is treated as "nothing configured", never
/// as an error to the caller.
pub trait PreferenceSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Source with no preferences at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyPreferences;

impl PreferenceSource for EmptyPreferences {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}
