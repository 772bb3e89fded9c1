//! Namespace loader: resolves `(language, namespace)` pairs to bundles with
//! caching, request deduplication, bounded retries, and a layered fallback
//! chain.
//!
//! The loader never returns an error. Every call resolves to some bundle,
//! possibly empty, because the site must render *something* rather than fail
//! over a missing translation. The price of that policy is paid in fallback
//! tiers, which are reported on the outcome so callers and tests can observe
//! degradation without scraping logs.
//!
//! Load algorithm, in order:
//! 1. Cached bundle, if any.
//! 2. Backoff short-circuit for keys that keep failing (empty bundle, no
//!    fetch, nothing cached).
//! 3. Join or begin the deduplicated in-flight operation, which attempts the
//!    fetch up to `max_retries` times with exponential delays, then walks the
//!    fallback chain: default-language bundle, then the requested language's
//!    "common" bundle wrapped under the namespace key, then empty.
//!
//! Whatever the operation produces (fresh, fallback, or empty) is cached
//! under the original key so repeated navigations don't re-fetch.

use crate::cache::{Bundle, BundleCache, CacheKey};
use crate::clock::Clock;
use crate::config::LoaderConfig;
use crate::failure::FailureTracker;
use crate::inflight::InFlightTracker;
use crate::language::Language;
use crate::source::{BundleSource, SourceError};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

/// The namespace every route needs and the last structural fallback target.
pub const COMMON_NAMESPACE: &str = "common";

/// How a bundle was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTier {
    /// Served from the namespace cache.
    Cached,
    /// Fetched for the requested language.
    Fresh,
    /// The default language's bundle for the same namespace.
    CrossLanguage,
    /// The requested language's common bundle wrapped under the namespace key.
    Structural,
    /// Nothing could be loaded; an empty bundle.
    Empty,
}

/// The result of one `load` call: a bundle plus the tier it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub bundle: Bundle,
    pub tier: FallbackTier,
}

impl LoadOutcome {
    pub fn empty() -> Self {
        Self {
            bundle: Bundle::new(),
            tier: FallbackTier::Empty,
        }
    }

    /// Whether this outcome is anything other than the requested content.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.tier,
            FallbackTier::CrossLanguage | FallbackTier::Structural | FallbackTier::Empty
        )
    }
}

impl Default for LoadOutcome {
    fn default() -> Self {
        Self::empty()
    }
}

/// Counters for loader activity, readable by tests and the preflight binary.
#[derive(Default)]
pub struct LoaderMetrics {
    fetch_attempts: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    backoff_skips: AtomicUsize,
    cross_language_fallbacks: AtomicUsize,
    structural_fallbacks: AtomicUsize,
    empty_results: AtomicUsize,
}

impl LoaderMetrics {
    fn record_fetch_attempt(&self) {
        self.fetch_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_backoff_skip(&self) {
        self.backoff_skips.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cross_language_fallback(&self) {
        self.cross_language_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    fn record_structural_fallback(&self) {
        self.structural_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    fn record_empty_result(&self) {
        self.empty_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_attempts(&self) -> usize {
        self.fetch_attempts.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn backoff_skips(&self) -> usize {
        self.backoff_skips.load(Ordering::Relaxed)
    }

    pub fn cross_language_fallbacks(&self) -> usize {
        self.cross_language_fallbacks.load(Ordering::Relaxed)
    }

    pub fn structural_fallbacks(&self) -> usize {
        self.structural_fallbacks.load(Ordering::Relaxed)
    }

    pub fn empty_results(&self) -> usize {
        self.empty_results.load(Ordering::Relaxed)
    }
}

pub struct NamespaceLoader {
    source: Arc<dyn BundleSource>,
    cache: Arc<BundleCache>,
    failures: Arc<FailureTracker>,
    metrics: Arc<LoaderMetrics>,
    inflight: Arc<InFlightTracker<LoadOutcome>>,
    config: LoaderConfig,
}

impl NamespaceLoader {
    pub fn new(source: Arc<dyn BundleSource>, config: LoaderConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            cache: Arc::new(BundleCache::new()),
            failures: Arc::new(FailureTracker::new(clock.clone(), &config)),
            metrics: Arc::new(LoaderMetrics::default()),
            inflight: Arc::new(InFlightTracker::new(clock)),
            config,
        }
    }

    pub fn cache(&self) -> &Arc<BundleCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<LoaderMetrics> {
        &self.metrics
    }

    pub fn failures(&self) -> &Arc<FailureTracker> {
        &self.failures
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Start the periodic stuck-entry sweep for the in-flight tracker.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.inflight
            .spawn_sweeper(self.config.sweep_period, self.config.inflight_max_age)
    }

    /// Load one namespace for one language.
    ///
    /// Never fails; see the module documentation for the full algorithm.
    pub async fn load(&self, language: Language, namespace: &str) -> LoadOutcome {
        let key = CacheKey::new(language, namespace);

        if let Some(bundle) = self.cache.get(&key) {
            self.metrics.record_cache_hit();
            return LoadOutcome {
                bundle,
                tier: FallbackTier::Cached,
            };
        }
        self.metrics.record_cache_miss();

        if self.failures.should_skip(&key) {
            self.metrics.record_backoff_skip();
            warn!("{}: in backoff window, serving empty bundle without fetching", key);
            return LoadOutcome::empty();
        }

        let ctx = OperationContext {
            source: Arc::clone(&self.source),
            cache: Arc::clone(&self.cache),
            failures: Arc::clone(&self.failures),
            metrics: Arc::clone(&self.metrics),
            config: self.config.clone(),
        };
        let op_namespace = namespace.to_string();
        let shared = self.inflight.begin_or_join(key.clone(), move || {
            run_operation(ctx, language, op_namespace).boxed()
        });

        // Hard ceiling on this call. The operation keeps running in the
        // background and will still populate the cache when it settles.
        match timeout(self.config.load_ceiling, shared).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "{}: load exceeded {:?} ceiling, serving empty bundle",
                    key, self.config.load_ceiling
                );
                LoadOutcome::empty()
            }
        }
    }

    /// Load several namespaces in parallel, settling each independently.
    ///
    /// A namespace that ends up empty contributes nothing to the result map;
    /// every other tier (including fallbacks) is included.
    pub async fn load_many(
        &self,
        language: Language,
        namespaces: &[String],
    ) -> HashMap<String, Bundle> {
        let loads = namespaces.iter().map(|namespace| async move {
            let outcome = self.load(language, namespace).await;
            (namespace.clone(), outcome)
        });

        let mut result = HashMap::new();
        let mut failed = Vec::new();
        for (namespace, outcome) in futures::future::join_all(loads).await {
            if outcome.tier == FallbackTier::Empty {
                failed.push(namespace);
            } else {
                result.insert(namespace, outcome.bundle);
            }
        }

        if !failed.is_empty() {
            warn!(
                "batch load for {} finished with {} empty namespaces: {:?}",
                language,
                failed.len(),
                failed
            );
        }
        result
    }
}

struct OperationContext {
    source: Arc<dyn BundleSource>,
    cache: Arc<BundleCache>,
    failures: Arc<FailureTracker>,
    metrics: Arc<LoaderMetrics>,
    config: LoaderConfig,
}

enum AttemptFailure {
    /// The key is not in the registry at all.
    Absent,
    /// The resource definitively does not exist; retrying cannot help.
    NotFound,
    /// Timeout, transport error, or malformed data; worth retrying.
    Transient,
}

/// One fetch attempt for a key, bounded by the per-attempt timeout.
async fn attempt_fetch(
    ctx: &OperationContext,
    language: Language,
    namespace: &str,
) -> Result<Bundle, AttemptFailure> {
    let Some(pending) = ctx.source.resolve(language, namespace) else {
        return Err(AttemptFailure::Absent);
    };
    ctx.metrics.record_fetch_attempt();

    match timeout(ctx.config.fetch_timeout, pending).await {
        Ok(Ok(serde_json::Value::Object(bundle))) => Ok(bundle),
        Ok(Ok(other)) => {
            warn!(
                "{}:{}: resource is not a JSON object (got {}), treating as failure",
                language,
                namespace,
                json_type_name(&other)
            );
            Err(AttemptFailure::Transient)
        }
        Ok(Err(SourceError::NotFound)) => Err(AttemptFailure::NotFound),
        Ok(Err(e)) => {
            warn!("{}:{}: fetch failed: {}", language, namespace, e);
            Err(AttemptFailure::Transient)
        }
        Err(_) => {
            warn!(
                "{}:{}: fetch timed out after {:?}",
                language, namespace, ctx.config.fetch_timeout
            );
            Err(AttemptFailure::Transient)
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Delay before the next attempt: doubles per attempt, capped.
fn retry_delay(config: &LoaderConfig, attempt: u32) -> Duration {
    config
        .retry_base_delay
        .saturating_mul(1u32 << attempt.min(8))
        .min(config.retry_max_delay)
}

/// The deduplicated load operation: retries, fallback chain, bookkeeping.
async fn run_operation(ctx: OperationContext, language: Language, namespace: String) -> LoadOutcome {
    let key = CacheKey::new(language, &namespace);
    let default = Language::default();
    let mut attempted_and_failed = false;
    let mut resolved: Option<(Bundle, FallbackTier)> = None;

    for attempt in 0..ctx.config.max_retries {
        match attempt_fetch(&ctx, language, &namespace).await {
            Ok(bundle) => {
                resolved = Some((bundle, FallbackTier::Fresh));
                break;
            }
            Err(AttemptFailure::Absent) => {
                debug!("{}: not in resource registry", key);
                break;
            }
            Err(AttemptFailure::NotFound) => {
                attempted_and_failed = true;
                break;
            }
            Err(AttemptFailure::Transient) => {
                attempted_and_failed = true;
                let remaining = ctx.config.max_retries - attempt - 1;
                if remaining > 0 {
                    let delay = retry_delay(&ctx.config, attempt);
                    debug!(
                        "{}: attempt {}/{} failed, retrying in {:?}",
                        key,
                        attempt + 1,
                        ctx.config.max_retries,
                        delay
                    );
                    sleep(delay).await;
                } else {
                    warn!("{}: all {} attempts failed", key, ctx.config.max_retries);
                }
            }
        }
    }

    // Cross-language fallback: the default language's bundle for the same
    // namespace, one attempt only.
    if resolved.is_none() && language != default {
        if let Ok(bundle) = attempt_fetch(&ctx, default, &namespace).await {
            ctx.metrics.record_cross_language_fallback();
            warn!("{}: serving {} fallback bundle", key, default.code());
            resolved = Some((bundle, FallbackTier::CrossLanguage));
        }
    }

    // Structural fallback: the requested language's common bundle wrapped
    // under the namespace key, so nested lookups find an object instead of
    // nothing.
    if resolved.is_none() && namespace != COMMON_NAMESPACE {
        if let Ok(common) = attempt_fetch(&ctx, language, COMMON_NAMESPACE).await {
            ctx.metrics.record_structural_fallback();
            warn!("{}: serving common bundle as structural fallback", key);
            let mut wrapped = Bundle::new();
            wrapped.insert(namespace.clone(), serde_json::Value::Object(common));
            resolved = Some((wrapped, FallbackTier::Structural));
        }
    }

    let (bundle, tier) = resolved.unwrap_or_else(|| {
        ctx.metrics.record_empty_result();
        error!("{}: no translation source available, serving empty bundle", key);
        (Bundle::new(), FallbackTier::Empty)
    });

    match tier {
        FallbackTier::Empty if attempted_and_failed => ctx.failures.record_failure(&key),
        // Pure registry absence: there is nothing to back off from.
        FallbackTier::Empty => {}
        _ => ctx.failures.record_success(&key),
    }

    // Every terminal bundle is cached under the original key, fallbacks and
    // empties included, so repeated navigations don't re-fetch.
    ctx.cache.insert(key, bundle.clone());

    LoadOutcome { bundle, tier }
}
