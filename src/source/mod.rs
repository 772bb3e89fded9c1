//! The namespace resource registry seam.
//!
//! The loader's only requirement of its environment is: given a known
//! `(language, namespace)` key, asynchronously resolve to a JSON value or
//! fail. `resolve` returning `None` means the key is not in the registry at
//! all, which the loader treats differently from a transient failure (it goes
//! straight to the cross-language fallback instead of retrying).

mod fs;
mod http;

pub use fs::FileSource;
pub use http::HttpSource;

use crate::language::Language;
use futures::future::BoxFuture;
use std::collections::HashMap;
use thiserror::Error;

/// A pending resolution of one namespace resource.
pub type BundleFuture = BoxFuture<'static, Result<serde_json::Value, SourceError>>;

/// Errors a bundle source can produce.
///
/// These never escape the loader; they exist so the fallback chain can tell
/// permanent absence (`NotFound`) apart from transient failure.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The resource definitively does not exist (e.g., HTTP 404).
    #[error("resource not found")]
    NotFound,

    /// The resource could not be read.
    #[error("resource could not be read: {0}")]
    Io(#[from] std::io::Error),

    /// The resource is not valid JSON.
    #[error("resource is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected http status {0}")]
    Status(u16),
}

/// A registry of loadable translation resources.
pub trait BundleSource: Send + Sync {
    /// Resolve a `(language, namespace)` key to a pending load, or `None`
    /// when the key is not in the registry.
    fn resolve(&self, language: Language, namespace: &str) -> Option<BundleFuture>;
}

/// An in-memory source backed by a fixed map of bundles.
///
/// Used for bundled core namespaces (content compiled into the binary at
/// build time) and throughout the test suite.
#[derive(Default)]
pub struct StaticSource {
    bundles: HashMap<(Language, String), serde_json::Value>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(
        mut self,
        language: Language,
        namespace: &str,
        value: serde_json::Value,
    ) -> Self {
        self.bundles
            .insert((language, namespace.to_string()), value);
        self
    }
}

impl BundleSource for StaticSource {
    fn resolve(&self, language: Language, namespace: &str) -> Option<BundleFuture> {
        let value = self.bundles.get(&(language, namespace.to_string()))?.clone();
        Some(Box::pin(async move { Ok(value) }))
    }
}
