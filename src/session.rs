//! The language session: the contract the page shell consumes.
//!
//! Owns the currently active language and coordinates switches: required
//! namespaces for the current route are loaded *before* the active language
//! flips, so the shell never renders the new direction with untranslated
//! strings (unless the ensure timeout forces proceeding with whatever is
//! cached, a deliberate availability tradeoff).
//!
//! Like the loader underneath it, the session never fails: every operation
//! resolves to a best-effort language code.

use crate::cache::{Bundle, CacheKey};
use crate::language::{Direction, Language};
use crate::loader::NamespaceLoader;
use crate::routes::namespaces_for_route;
use std::sync::{Arc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub struct LanguageSession {
    loader: Arc<NamespaceLoader>,
    active: Mutex<Language>,
    init: tokio::sync::Mutex<bool>,
    /// Bundles established at process start (compiled-in core content),
    /// seeded into the cache during initialization.
    preloaded: Vec<(Language, String, Bundle)>,
}

impl LanguageSession {
    /// Build a session over a loader and start the loader's stuck-entry
    /// sweep.
    ///
    /// Must be called from within a tokio runtime. The sweep task exits on
    /// its own once the loader is dropped.
    pub fn new(loader: Arc<NamespaceLoader>) -> Self {
        loader.spawn_sweeper();
        Self {
            loader,
            active: Mutex::new(Language::default()),
            init: tokio::sync::Mutex::new(false),
            preloaded: Vec::new(),
        }
    }

    /// Register a bundle to seed into the cache during [`initialize`].
    ///
    /// [`initialize`]: LanguageSession::initialize
    pub fn with_preloaded(
        mut self,
        language: Language,
        namespace: &str,
        bundle: Bundle,
    ) -> Self {
        self.preloaded
            .push((language, namespace.to_string(), bundle));
        self
    }

    pub fn loader(&self) -> &Arc<NamespaceLoader> {
        &self.loader
    }

    /// The currently active language.
    pub fn active_language(&self) -> Language {
        *self.active.lock().unwrap()
    }

    /// Text direction of the active language.
    pub fn direction(&self) -> Direction {
        self.active_language().direction()
    }

    /// One-time setup: seed preloaded core bundles, then apply the detected
    /// language.
    ///
    /// Single-flight: concurrent callers queue on the init guard and all
    /// observe the one completed initialization. Because the underlying
    /// operations never fail, initialization cannot wedge; a repeat call is
    /// a no-op that returns the active language.
    pub async fn initialize(&self, detected: &str) -> Language {
        let mut done = self.init.lock().await;
        if *done {
            debug!("session already initialized, skipping");
            return self.active_language();
        }

        for (language, namespace, bundle) in &self.preloaded {
            self.loader
                .cache()
                .insert(CacheKey::new(*language, namespace), bundle.clone());
        }

        let applied = self.ensure_language(detected, Some("/")).await;

        // Switching to a non-default detected language invalidates the
        // default language's entries, seeds included. Preloaded bundles are
        // compiled-in and always valid, so restore any that a fresh load
        // didn't replace.
        for (language, namespace, bundle) in &self.preloaded {
            let key = CacheKey::new(*language, namespace);
            if self.loader.cache().get(&key).is_none() {
                self.loader.cache().insert(key, bundle.clone());
            }
        }

        *done = true;
        info!("language session initialized with {}", applied);
        applied
    }

    /// Ensure `target` is the active language, loading what `route` needs
    /// first.
    ///
    /// Returns the normalized language actually applied. Steps, in order:
    /// 1. Normalize the target (unknown codes fall back to the default).
    /// 2. If switching away from another language, invalidate its cache
    ///    entries so a later revisit loads fresh content.
    /// 3. If a route is given, batch-load its namespaces under an outer
    ///    timeout; on timeout, log and proceed with whatever is cached.
    /// 4. Flip the active language only after the loads settle.
    pub async fn ensure_language(&self, target: &str, route: Option<&str>) -> Language {
        let target = Language::normalize(target);

        let previous = self.active_language();
        if previous != target {
            let removed = self.loader.cache().invalidate_language(previous);
            debug!(
                "switching {} -> {}, invalidated {} cached bundles",
                previous, target, removed
            );
        }

        if let Some(route) = route {
            let namespaces = namespaces_for_route(route);
            let ceiling = self.loader.config().ensure_timeout;
            match timeout(ceiling, self.loader.load_many(target, &namespaces)).await {
                Ok(loaded) => {
                    debug!(
                        "loaded {}/{} namespaces for {} on {}",
                        loaded.len(),
                        namespaces.len(),
                        target,
                        route
                    );
                }
                Err(_) => {
                    warn!(
                        "namespace loading for {} on {} exceeded {:?}, proceeding with cached content",
                        target, route, ceiling
                    );
                }
            }
        }

        *self.active.lock().unwrap() = target;
        target
    }
}
