//! Namespace cache: the ground truth for "what's already loaded".
//!
//! Entries are overwritten wholesale on reload, never mutated in place, so a
//! bundle handed to a caller is always a consistent snapshot.

use crate::language::Language;
use std::collections::HashMap;
use std::sync::Mutex;

/// The resolved key-value translation data for one namespace in one language.
///
/// Absence is represented by an empty bundle, never by null.
pub type Bundle = serde_json::Map<String, serde_json::Value>;

/// Identifies one translation bundle: a `(language, namespace)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub language: Language,
    pub namespace: String,
}

impl CacheKey {
    pub fn new(language: Language, namespace: &str) -> Self {
        Self {
            language,
            namespace: namespace.to_string(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.language.code(), self.namespace)
    }
}

/// In-memory store of resolved translation bundles.
///
/// All operations succeed unconditionally; there is no error path here.
#[derive(Default)]
pub struct BundleCache {
    entries: Mutex<HashMap<CacheKey, Bundle>>,
}

impl BundleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached bundle, returning a snapshot clone.
    pub fn get(&self, key: &CacheKey) -> Option<Bundle> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Store a bundle, overwriting any existing entry for the key.
    pub fn insert(&self, key: CacheKey, bundle: Bundle) {
        self.entries.lock().unwrap().insert(key, bundle);
    }

    /// Remove every entry for the given language.
    ///
    /// Used when switching away from a language so that a revisit loads fresh
    /// content instead of serving possibly stale bundles.
    pub fn invalidate_language(&self, language: Language) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| key.language != language);
        before - entries.len()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Number of cached bundles.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
