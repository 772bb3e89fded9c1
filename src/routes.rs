//! Route-to-namespace resolution.
//!
//! A static, hand-authored table maps each site route to the namespace group
//! its page needs. Resolution is pure: normalize the path (drop query and
//! fragment, strip any language prefix, strip the trailing slash), look it up,
//! and return the core group plus whatever the table says. Unknown paths get
//! the core group only, so every route can at least render the shell.

use crate::language::LanguageRegistry;

/// Namespaces every route needs: shell chrome rendered on every page.
pub const CORE_NAMESPACES: &[&str] = &["common", "navigation", "footer"];

/// Route table. Paths are stored normalized (no language prefix, no trailing
/// slash except the root itself).
const ROUTE_TABLE: &[(&str, &[&str])] = &[
    ("/", &["home", "hero"]),
    ("/products", &["products", "trading"]),
    ("/education", &["education"]),
    ("/partners", &["partners"]),
    ("/contact", &["contact", "forms"]),
    ("/about", &["about"]),
    ("/calculator", &["calculator", "trading"]),
    ("/faq", &["faq"]),
];

/// All paths the route table knows about, for preflight iteration.
pub fn known_routes() -> impl Iterator<Item = &'static str> {
    ROUTE_TABLE.iter().map(|(path, _)| *path)
}

/// Resolve a URL path to the namespaces needed to render it.
///
/// Always returns at least [`CORE_NAMESPACES`]; route-specific namespaces are
/// appended after the core group, duplicates removed.
pub fn namespaces_for_route(path: &str) -> Vec<String> {
    let normalized = normalize_route(path);

    let mut namespaces: Vec<String> = CORE_NAMESPACES.iter().map(|ns| ns.to_string()).collect();
    if let Some((_, group)) = ROUTE_TABLE.iter().find(|(route, _)| *route == normalized) {
        for ns in *group {
            if !namespaces.iter().any(|existing| existing == ns) {
                namespaces.push(ns.to_string());
            }
        }
    }
    namespaces
}

/// Normalize a raw browser path for table lookup.
fn normalize_route(path: &str) -> String {
    // Query and fragment never participate in routing
    let path = path.split(['?', '#']).next().unwrap_or("");
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    // Strip one leading language-prefix segment ("/ar/products" -> "/products")
    let stripped = strip_language_prefix(&path);

    // Trailing slash, except for the root
    let trimmed = stripped.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Remove a leading `/<code>` segment when `<code>` is an enabled language.
fn strip_language_prefix(path: &str) -> String {
    let registry = LanguageRegistry::get();
    for config in registry.list_enabled() {
        let prefix = format!("/{}", config.code);
        if path == prefix {
            return "/".to_string();
        }
        if let Some(rest) = path.strip_prefix(&prefix) {
            if rest.starts_with('/') {
                return rest.to_string();
            }
        }
    }
    path.to_string()
}
