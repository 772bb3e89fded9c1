//! Localized path construction.
//!
//! Links on the site carry a language prefix for every language except the
//! default: `/products` is English, `/ar/products` is Arabic. This module
//! turns an internal path into its external, language-prefixed form while
//! preserving (or overriding) query and fragment.
//!
//! The builder is total: any input string produces some usable path.

use crate::language::{Language, LanguageRegistry};

/// The root path for a language: `/` for the default, `/<code>` otherwise.
pub fn language_root(language: Language) -> String {
    if language.is_default() {
        "/".to_string()
    } else {
        format!("/{}", language.code())
    }
}

/// Build the external path for `path` in `language`.
///
/// Query and fragment embedded in `path` are preserved. When `search` or
/// `hash` is provided it replaces the embedded value entirely; passing an
/// empty string removes it (distinct from passing `None`, which keeps
/// whatever was embedded). Marker characters (`?`, `#`) are added if the
/// caller left them off.
pub fn localized_path(
    path: &str,
    language: Language,
    search: Option<&str>,
    hash: Option<&str>,
) -> String {
    let (pathname, embedded_search, embedded_hash) = split_path(path);

    let search = match search {
        Some(explicit) => normalize_marker(explicit, '?'),
        None => embedded_search
            .map(|s| normalize_marker(s, '?'))
            .unwrap_or_default(),
    };
    let hash = match hash {
        Some(explicit) => normalize_marker(explicit, '#'),
        None => embedded_hash
            .map(|h| normalize_marker(h, '#'))
            .unwrap_or_default(),
    };

    let pathname = if pathname.is_empty() {
        "/".to_string()
    } else if pathname.starts_with('/') {
        pathname.to_string()
    } else {
        format!("/{pathname}")
    };

    // Re-prefixing starts from the unprefixed form, so already-localized
    // paths don't accumulate prefixes.
    let bare = strip_locale_prefix(&pathname);
    let localized = if language.is_default() {
        bare
    } else if bare == "/" {
        format!("/{}", language.code())
    } else {
        format!("/{}{}", language.code(), bare)
    };

    format!("{localized}{search}{hash}")
}

/// Remove a leading `/<code>` segment for an enabled non-default language.
///
/// Only non-default languages carry a prefix in external paths, so a leading
/// segment matching the default language's code is ordinary path content and
/// is left alone.
fn strip_locale_prefix(path: &str) -> String {
    let registry = LanguageRegistry::get();
    for config in registry.list_enabled() {
        if config.is_default {
            continue;
        }
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

/// Split a raw path into `(pathname, search, hash)`, markers stripped.
///
/// The fragment is split off first so a `?` inside the fragment stays part
/// of the fragment.
fn split_path(path: &str) -> (&str, Option<&str>, Option<&str>) {
    let (before_hash, hash) = match path.split_once('#') {
        Some((before, after)) => (before, Some(after)),
        None => (path, None),
    };
    let (pathname, search) = match before_hash.split_once('?') {
        Some((before, after)) => (before, Some(after)),
        None => (before_hash, None),
    };
    (pathname, search, hash)
}

/// Ensure a non-empty value starts with its marker; empty stays empty.
fn normalize_marker(value: &str, marker: char) -> String {
    if value.is_empty() {
        String::new()
    } else if value.starts_with(marker) {
        value.to_string()
    } else {
        format!("{marker}{value}")
    }
}
