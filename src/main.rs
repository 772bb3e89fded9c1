use anyhow::{bail, Context, Result};
use locale_loader::{
    known_routes, namespaces_for_route, FallbackTier, FileSource, HttpSource, Language,
    LanguageRegistry, LoaderConfig, NamespaceLoader, SystemClock,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Content preflight: walk every enabled language and every known route,
/// load the namespaces each needs, and report which would degrade.
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locale_loader=info".parse()?),
        )
        .init();

    info!("Starting locale content preflight");

    let config = LoaderConfig::from_env();
    let source = source_from_env()?;
    let loader = Arc::new(NamespaceLoader::new(source, config, Arc::new(SystemClock)));
    let _sweeper = loader.spawn_sweeper();

    let mut degraded: Vec<String> = Vec::new();
    let mut missing: Vec<String> = Vec::new();

    for language_config in LanguageRegistry::get().list_enabled() {
        let language = Language::from_code(language_config.code)?;
        for route in known_routes() {
            for namespace in namespaces_for_route(route) {
                let outcome = loader.load(language, &namespace).await;
                let key = format!("{language}:{namespace} ({route})");
                match outcome.tier {
                    FallbackTier::Fresh | FallbackTier::Cached => {}
                    FallbackTier::Empty => missing.push(key),
                    _ => degraded.push(key),
                }
            }
        }
    }

    let metrics = loader.metrics();
    info!(
        "preflight issued {} fetches ({} hits, {} misses)",
        metrics.fetch_attempts(),
        metrics.cache_hits(),
        metrics.cache_misses()
    );

    for key in &degraded {
        warn!("degraded: {key}");
    }
    for key in &missing {
        warn!("missing: {key}");
    }

    if !missing.is_empty() {
        bail!(
            "{} namespaces have no content in any language",
            missing.len()
        );
    }

    info!(
        "Preflight passed ({} namespaces degraded to fallback content)",
        degraded.len()
    );
    Ok(())
}

/// Pick the content source: a remote origin when `LOCALE_CONTENT_URL` is set,
/// otherwise a local content directory.
fn source_from_env() -> Result<Arc<dyn locale_loader::BundleSource>> {
    if let Ok(base_url) = std::env::var("LOCALE_CONTENT_URL") {
        info!("Loading content from origin {base_url}");
        return Ok(Arc::new(HttpSource::new(base_url)));
    }

    let root = std::env::var("LOCALE_CONTENT_DIR")
        .context("set LOCALE_CONTENT_URL or LOCALE_CONTENT_DIR to point at locale content")?;
    info!("Loading content from directory {root}");
    Ok(Arc::new(FileSource::new(root)))
}
