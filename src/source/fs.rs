//! Filesystem-backed bundle source.
//!
//! Expects content laid out as `<root>/<language>/<namespace>.json`. The
//! registry check is a synchronous existence test so the loader can tell
//! "never existed" apart from "failed to read".

use super::{BundleFuture, BundleSource};
use crate::language::Language;
use std::path::PathBuf;

pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bundle_path(&self, language: Language, namespace: &str) -> PathBuf {
        self.root
            .join(language.code())
            .join(format!("{namespace}.json"))
    }
}

impl BundleSource for FileSource {
    fn resolve(&self, language: Language, namespace: &str) -> Option<BundleFuture> {
        let path = self.bundle_path(language, namespace);
        if !path.is_file() {
            return None;
        }

        Some(Box::pin(async move {
            let text = tokio::fs::read_to_string(&path).await?;
            let value = serde_json::from_str(&text)?;
            Ok(value)
        }))
    }
}
