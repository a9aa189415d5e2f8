//! Fetching MCP schema documents from source URLs.
//!
//! Source URLs usually point at a repository page rather than the schema file
//! itself, so the HTTP fetcher rewrites GitHub and Hugging Face page URLs to
//! raw-content URLs and tries the conventional schema filenames.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::Value;
use url::Url;

use super::extract::parse_document;
use super::validate::looks_like_mcp;
use crate::error::{PlaygroundError, Result};

/// Conventional schema filenames tried in a repository root, in order.
pub const SCHEMA_FILENAMES: &[&str] = &[
    "mcp.json",
    ".mcp.json",
    "mcp.yaml",
    "mcp.yml",
    "tools.json",
    "schema.json",
];

const USER_AGENT: &str = concat!("mcp-playground/", env!("CARGO_PKG_VERSION"));

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    crate::ensure_tls_provider();
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Outbound quota: `per_minute` sustained, up to `burst` at once.
pub fn outbound_quota(per_minute: u32, burst: u32) -> Result<Quota> {
    let per_minute = NonZeroU32::new(per_minute).ok_or_else(|| {
        PlaygroundError::Config("outbound_requests_per_minute must be positive".into())
    })?;
    let burst = NonZeroU32::new(burst)
        .ok_or_else(|| PlaygroundError::Config("outbound_burst must be positive".into()))?;
    Ok(Quota::per_minute(per_minute).allow_burst(burst))
}

/// The HTTP client shared by the fetcher and every source adapter.
///
/// All outbound requests draw from one token bucket, so a single search
/// fanning out to several APIs and schema lookups cannot trip upstream rate
/// limits. Clones share the bucket.
#[derive(Clone)]
pub struct RateLimitedClient {
    client: reqwest::Client,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl RateLimitedClient {
    pub fn new(timeout: Duration, quota: Quota) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Wait for a quota slot, then start a GET request.
    pub async fn get(&self, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.limiter.until_ready().await;
        self.client.get(url)
    }

    /// Take a quota slot without waiting. False when the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

/// A parsed schema document and where it was actually found.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub document: Value,
    pub file_type: &'static str,
}

/// Retrieves an MCP schema document for a source URL.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch_schema(&self, source_url: &str) -> Result<FetchedDocument>;
}

/// Fetches schema documents over HTTP.
#[derive(Clone)]
pub struct HttpSchemaFetcher {
    client: RateLimitedClient,
}

impl HttpSchemaFetcher {
    pub fn new(client: RateLimitedClient) -> Self {
        Self { client }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).await.send().await?;
        if !response.status().is_success() {
            return Err(PlaygroundError::Fetch(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SchemaFetcher for HttpSchemaFetcher {
    async fn fetch_schema(&self, source_url: &str) -> Result<FetchedDocument> {
        let candidates = candidate_urls(source_url)?;
        let mut reached_any = false;

        for candidate in &candidates {
            let content = match self.get_text(candidate).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::debug!("Schema fetch {} failed: {}", candidate, e);
                    continue;
                }
            };
            reached_any = true;

            match parse_document(&content) {
                Some((document, file_type)) if looks_like_mcp(&document) => {
                    tracing::debug!("Found MCP schema at {}", candidate);
                    return Ok(FetchedDocument {
                        url: candidate.clone(),
                        document,
                        file_type,
                    });
                }
                _ => tracing::debug!("{} is not an MCP schema document", candidate),
            }
        }

        Err(PlaygroundError::Fetch(if reached_any {
            format!("no MCP schema could be parsed from {}", source_url)
        } else {
            format!("{} is unreachable", source_url)
        }))
    }
}

/// Raw-content URLs to try for a source URL.
///
/// - `github.com/o/r/blob/ref/path` → the raw file
/// - `github.com/o/r[/tree/ref/dir]` → each conventional filename under it
/// - `huggingface.co/ns/repo` → each conventional filename on `main`
/// - anything else is fetched as-is
pub fn candidate_urls(source_url: &str) -> Result<Vec<String>> {
    let url = Url::parse(source_url.trim())
        .map_err(|e| PlaygroundError::InvalidRequest(format!("invalid source URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PlaygroundError::InvalidRequest(format!(
            "unsupported URL scheme '{}'",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .unwrap_or_default()
        .trim_start_matches("www.")
        .to_lowercase();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let candidates = |base: String| -> Vec<String> {
        SCHEMA_FILENAMES
            .iter()
            .map(|f| format!("{}/{}", base.trim_end_matches('/'), f))
            .collect()
    };

    let urls = match (host.as_str(), segments.as_slice()) {
        ("github.com", [owner, repo, "blob", git_ref, path @ ..]) if !path.is_empty() => {
            vec![format!(
                "https://raw.githubusercontent.com/{}/{}/{}/{}",
                owner,
                repo.trim_end_matches(".git"),
                git_ref,
                path.join("/")
            )]
        }
        ("github.com", [owner, repo, "tree", git_ref, dir @ ..]) => candidates(format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            owner,
            repo.trim_end_matches(".git"),
            git_ref,
            dir.join("/")
        )),
        ("github.com", [owner, repo]) => candidates(format!(
            "https://raw.githubusercontent.com/{}/{}/HEAD",
            owner,
            repo.trim_end_matches(".git")
        )),
        ("huggingface.co", [namespace, repo]) => candidates(format!(
            "https://huggingface.co/{}/{}/raw/main",
            namespace, repo
        )),
        ("huggingface.co", ["spaces", namespace, repo]) => candidates(format!(
            "https://huggingface.co/spaces/{}/{}/raw/main",
            namespace, repo
        )),
        _ => vec![url.to_string()],
    };

    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_blob_is_rewritten_to_raw() {
        let urls =
            candidate_urls("https://github.com/x/weather-mcp/blob/main/config/mcp.json").unwrap();
        assert_eq!(
            urls,
            vec!["https://raw.githubusercontent.com/x/weather-mcp/main/config/mcp.json"]
        );
    }

    #[test]
    fn test_github_repo_tries_conventional_files() {
        let urls = candidate_urls("https://github.com/x/weather-mcp/").unwrap();
        assert_eq!(urls.len(), SCHEMA_FILENAMES.len());
        assert_eq!(
            urls[0],
            "https://raw.githubusercontent.com/x/weather-mcp/HEAD/mcp.json"
        );
    }

    #[test]
    fn test_github_tree_looks_in_directory() {
        let urls =
            candidate_urls("https://github.com/modelcontextprotocol/servers/tree/main/src/weather")
                .unwrap();
        assert_eq!(
            urls[0],
            "https://raw.githubusercontent.com/modelcontextprotocol/servers/main/src/weather/mcp.json"
        );
    }

    #[test]
    fn test_huggingface_repo() {
        let urls = candidate_urls("https://huggingface.co/acme/weather-tools").unwrap();
        assert_eq!(
            urls[0],
            "https://huggingface.co/acme/weather-tools/raw/main/mcp.json"
        );
    }

    #[test]
    fn test_other_urls_fetched_directly() {
        let urls = candidate_urls("https://example.com/schemas/weather.mcp.json").unwrap();
        assert_eq!(urls, vec!["https://example.com/schemas/weather.mcp.json"]);
    }

    #[test]
    fn test_outbound_quota_limits_bursts() {
        let client =
            RateLimitedClient::new(Duration::from_secs(1), outbound_quota(1, 3).unwrap()).unwrap();
        let shared = client.clone();
        assert!(client.try_acquire());
        assert!(shared.try_acquire());
        assert!(client.try_acquire());
        // clones draw from the same bucket
        assert!(!shared.try_acquire());
        assert!(!client.try_acquire());
    }

    #[test]
    fn test_outbound_quota_rejects_zero() {
        assert!(matches!(outbound_quota(0, 5), Err(PlaygroundError::Config(_))));
        assert!(matches!(outbound_quota(30, 0), Err(PlaygroundError::Config(_))));
    }

    #[tokio::test]
    async fn test_get_waits_for_a_slot() {
        let client = RateLimitedClient::new(
            Duration::from_secs(1),
            Quota::per_second(NonZeroU32::new(20).unwrap()).allow_burst(NonZeroU32::new(1).unwrap()),
        )
        .unwrap();
        let started = std::time::Instant::now();
        let _ = client.get("https://example.com/a").await;
        let _ = client.get("https://example.com/b").await;
        // second request had to wait for the bucket to refill (50ms per token)
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(candidate_urls("not a url").is_err());
        assert!(candidate_urls("ftp://example.com/mcp.json").is_err());
    }
}
