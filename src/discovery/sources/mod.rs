//! Source adapters: one per external platform.
//!
//! Each adapter normalizes its platform's native result shape into
//! `McpRecord`s. Adapters never assign confidence scores; they only supply
//! the raw signals (schema, stars, platform) the scorer needs.

pub mod awesome;
pub mod github;
pub mod huggingface;
pub mod registry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::fetch::{FetchedDocument, RateLimitedClient, SchemaFetcher};
use crate::error::{PlaygroundError, Result};
use crate::record::{McpRecord, SourcePlatform};
use crate::settings::Settings;

/// A searchable external source of MCP records.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The single platform this adapter owns.
    fn platform(&self) -> SourcePlatform;

    /// Search for at most `limit` records matching `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<McpRecord>>;
}

/// An API endpoint with form-encoded query parameters.
pub(crate) fn api_url(endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
    Url::parse_with_params(endpoint, params)
        .map_err(|e| PlaygroundError::Config(format!("invalid API URL {}: {}", endpoint, e)))
}

/// Fetch schemas for `urls` concurrently.
///
/// Each lookup gets at most `deadline`. A lookup that fails or runs out of time
/// yields `None`; the caller keeps its metadata-only record.
pub(crate) async fn fetch_schemas(
    fetcher: &dyn SchemaFetcher,
    urls: &[String],
    deadline: Duration,
) -> Vec<Option<FetchedDocument>> {
    let lookups = urls.iter().map(|url| async move {
        match tokio::time::timeout(deadline, fetcher.fetch_schema(url)).await {
            Ok(Ok(doc)) => Some(doc),
            Ok(Err(e)) => {
                tracing::debug!("No schema for {}: {}", url, e);
                None
            }
            Err(_) => {
                tracing::debug!("Schema lookup for {} timed out after {:?}", url, deadline);
                None
            }
        }
    });
    futures::future::join_all(lookups).await
}

/// Build the HTTP adapters for every platform enabled in settings.
///
/// Schema lookups get half the adapter timeout so an adapter always has time
/// left to return its metadata records.
pub fn build_adapters(
    settings: &Settings,
    client: &RateLimitedClient,
    fetcher: Arc<dyn SchemaFetcher>,
) -> Vec<Arc<dyn SourceAdapter>> {
    let schema_timeout = settings.adapter_timeout() / 2;

    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for platform in settings.enabled_platforms() {
        let adapter: Arc<dyn SourceAdapter> = match platform {
            SourcePlatform::Github => Arc::new(github::GithubAdapter::new(
                client.clone(),
                fetcher.clone(),
                settings.github_token.clone(),
                schema_timeout,
            )),
            SourcePlatform::Huggingface => Arc::new(huggingface::HuggingFaceAdapter::new(
                client.clone(),
                fetcher.clone(),
                schema_timeout,
            )),
            SourcePlatform::Web => Arc::new(registry::RegistryAdapter::new(client.clone())),
            SourcePlatform::Awesome => Arc::new(awesome::AwesomeListAdapter::new(
                client.clone(),
                fetcher.clone(),
                settings.awesome_lists.clone(),
                schema_timeout,
            )),
            SourcePlatform::Catalog => continue,
        };
        adapters.push(adapter);
    }

    tracing::info!(
        "Source adapters ready: {}",
        adapters
            .iter()
            .map(|a| a.platform().as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    adapters
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::discovery::fetch::{outbound_quota, HttpSchemaFetcher};
    use serde_json::json;
    use std::time::Instant;

    /// Answers instantly for URLs containing "fast", hangs on everything else.
    pub(crate) struct SlowFetcher;

    #[async_trait]
    impl SchemaFetcher for SlowFetcher {
        async fn fetch_schema(&self, source_url: &str) -> Result<FetchedDocument> {
            if !source_url.contains("fast") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(FetchedDocument {
                url: source_url.to_string(),
                document: json!({ "name": "fast-mcp", "tools": [{ "name": "ping" }] }),
                file_type: "json",
            })
        }
    }

    pub(crate) fn test_client() -> RateLimitedClient {
        RateLimitedClient::new(Duration::from_secs(1), outbound_quota(600, 100).unwrap()).unwrap()
    }

    #[test]
    fn test_api_url_encodes_params() {
        let url = api_url(
            "https://api.github.com/search/repositories",
            &[("q", "weather api mcp"), ("sort", "stars")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/search/repositories?q=weather+api+mcp&sort=stars"
        );
        let url = api_url("https://x.test/s", &[("search", "a+b&c")]).unwrap();
        assert_eq!(url.query(), Some("search=a%2Bb%26c"));
    }

    #[tokio::test]
    async fn test_schema_deadline_keeps_fast_results() {
        let urls = vec![
            "https://github.com/x/fast-mcp".to_string(),
            "https://github.com/x/hanging".to_string(),
        ];
        let started = Instant::now();
        let found = fetch_schemas(&SlowFetcher, &urls, Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(found.len(), 2);
        assert!(found[0].is_some());
        assert!(found[1].is_none());
    }

    #[test]
    fn test_build_adapters_respects_enabled_sources() {
        let settings = Settings {
            enabled_sources: vec![SourcePlatform::Github, SourcePlatform::Awesome],
            ..Settings::default()
        };
        let client = test_client();
        let fetcher: Arc<dyn SchemaFetcher> = Arc::new(HttpSchemaFetcher::new(client.clone()));
        let adapters = build_adapters(&settings, &client, fetcher);
        let platforms: Vec<SourcePlatform> = adapters.iter().map(|a| a.platform()).collect();
        assert_eq!(
            platforms,
            vec![SourcePlatform::Github, SourcePlatform::Awesome]
        );
    }
}
