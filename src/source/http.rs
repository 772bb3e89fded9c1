//! HTTP-backed bundle source.
//!
//! Fetches locale fragments from a content origin laid out as
//! `<base>/<language>/<namespace>.json` (the same shape a CDN bucket of
//! exported translation files has). A 404 maps to `SourceError::NotFound` so
//! the loader can skip retries and fall back across languages immediately;
//! other non-success statuses are treated as transient.

use super::{BundleFuture, BundleSource, SourceError};
use crate::language::Language;

pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Use a preconfigured client (custom TLS, proxies, connection pools).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn bundle_url(&self, language: Language, namespace: &str) -> String {
        format!("{}/{}/{}.json", self.base_url, language.code(), namespace)
    }
}

impl BundleSource for HttpSource {
    fn resolve(&self, language: Language, namespace: &str) -> Option<BundleFuture> {
        let client = self.client.clone();
        let url = self.bundle_url(language, namespace);

        Some(Box::pin(async move {
            let response = client.get(&url).send().await?;
            let status = response.status();

            if status.as_u16() == 404 {
                return Err(SourceError::NotFound);
            }
            if !status.is_success() {
                return Err(SourceError::Status(status.as_u16()));
            }

            let value = response.json().await?;
            Ok(value)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_fetches_bundle_from_origin() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ar/products.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"title": "منتجات"})),
            )
            .mount(&server)
            .await;

        let source = HttpSource::new(server.uri());
        let value = source
            .resolve(Language::ARABIC, "products")
            .expect("http source registers every key")
            .await
            .expect("load should succeed");

        assert_eq!(value["title"], "منتجات");
    }

    #[tokio::test]
    async fn test_404_maps_to_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/en/missing.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpSource::new(server.uri());
        let result = source.resolve(Language::ENGLISH, "missing").unwrap().await;

        assert!(matches!(result, Err(SourceError::NotFound)));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/en/common.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpSource::new(server.uri());
        let result = source.resolve(Language::ENGLISH, "common").unwrap().await;

        assert!(matches!(result, Err(SourceError::Status(503))));
    }

    #[tokio::test]
    async fn test_invalid_body_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/en/common.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let source = HttpSource::new(server.uri());
        let result = source.resolve(Language::ENGLISH, "common").unwrap().await;

        assert!(result.is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let source = HttpSource::new("https://content.example.com/locales/");
        assert_eq!(
            source.bundle_url(Language::ENGLISH, "common"),
            "https://content.example.com/locales/en/common.json"
        );
    }
}
