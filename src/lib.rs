//! Dynamic translation loading for a bilingual (English/Arabic) site.
//!
//! The crate's center is [`NamespaceLoader`]: translation bundles are grouped
//! into namespaces and loaded lazily per `(language, namespace)` key, with an
//! in-memory cache, deduplication of concurrent loads, bounded retries with
//! backoff, and a layered fallback chain ending in an empty bundle. Nothing in
//! the public surface fails: a marketing page should always render something.
//!
//! [`LanguageSession`] sits on top and owns the active language, loading a
//! route's namespaces before each switch. [`localized_path`] builds the
//! language-prefixed links the shell navigates with.

pub mod cache;
pub mod clock;
pub mod config;
pub mod failure;
pub mod inflight;
pub mod language;
pub mod loader;
pub mod paths;
pub mod routes;
pub mod session;
pub mod source;

pub use cache::{Bundle, BundleCache, CacheKey};
pub use clock::{Clock, SystemClock};
pub use config::LoaderConfig;
pub use language::{Direction, Language, LanguageRegistry};
pub use loader::{FallbackTier, LoadOutcome, NamespaceLoader, COMMON_NAMESPACE};
pub use paths::{language_root, localized_path};
pub use routes::{known_routes, namespaces_for_route, CORE_NAMESPACES};
pub use session::LanguageSession;
pub use source::{BundleSource, FileSource, HttpSource, StaticSource};
