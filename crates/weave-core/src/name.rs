use std::collections::HashMap;
use std::sync::Mutex;

/// Canonicalizes class names to the `/`-separated internal form the codec
/// and mixin targets share, memoizing each input seen.
///
/// The cache is mutex-guarded rather than plain-`RefCell`-backed so an
/// `Engine` can be shared behind an `Arc` across loader threads even though
/// the documented calling convention for `modify_class` itself is serial
/// (see the crate-level docs on [`crate::Engine`]).
pub struct NameNormalizer {
    cache: Mutex<HashMap<String, String>>,
    max_entries: Option<usize>,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self { cache: Mutex::new(HashMap::new()), max_entries: None }
    }
}

impl NameNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalizer whose cache stops growing past `max_entries`
    /// (further lookups still compute the answer, they just aren't
    /// memoized) — the opt-in cap a host can pick via
    /// `EngineOptions::max_cache_entries`.
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        Self { cache: Mutex::new(HashMap::new()), max_entries }
    }

    /// Returns the normalized form of `name`, computing and caching it on
    /// first use. Idempotent: normalizing an already-normalized name returns
    /// it unchanged.
    pub fn normalize(&self, name: &str) -> String {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = cache.get(name) {
            return hit.clone();
        }
        let normalized = normalize_uncached(name);
        let at_cap = self.max_entries.is_some_and(|max| cache.len() >= max);
        if !at_cap {
            cache.insert(name.to_string(), normalized.clone());
        }
        normalized
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize_uncached(name: &str) -> String {
    name.replace('.', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dotted_names() {
        let n = NameNormalizer::new();
        assert_eq!(n.normalize("a.b.C"), "a/b/C");
    }

    #[test]
    fn already_slashed_names_pass_through() {
        let n = NameNormalizer::new();
        assert_eq!(n.normalize("a/b/C"), "a/b/C");
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let n = NameNormalizer::new();
        assert_eq!(n.len(), 0);
        n.normalize("a.b.C");
        assert_eq!(n.len(), 1);
        n.normalize("a.b.C");
        assert_eq!(n.len(), 1);
    }

    #[test]
    fn idempotent_under_repeated_normalization() {
        let n = NameNormalizer::new();
        let once = n.normalize("a.b.C");
        let twice = n.normalize(&once);
        assert_eq!(once, twice);
    }

    #[cfg(test)]
    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(128))]
            #[test]
            fn normalize_is_idempotent(s in "[a-zA-Z0-9_./]{0,40}") {
                let n = NameNormalizer::new();
                let once = n.normalize(&s);
                let twice = n.normalize(&once);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
