//! Generic web source: the official MCP Registry (registry.modelcontextprotocol.io).
//!
//! The registry lists published servers with their packages and remotes but
//! no tool schemas, so records from here are never validated on their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{api_url, SourceAdapter};
use crate::discovery::extract::{infer_domain, infer_tags};
use crate::discovery::fetch::RateLimitedClient;
use crate::error::{PlaygroundError, Result};
use crate::record::{McpRecord, SourcePlatform};

const REGISTRY_BASE_URL: &str = "https://registry.modelcontextprotocol.io";
const REGISTRY_API_VERSION: &str = "v0.1";
const REGISTRY_PAGE_LIMIT: usize = 100;

/// A server entry from the official MCP Registry API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryServer {
    /// Reverse-DNS name (e.g., "io.github.user/weather").
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<RegistryRepository>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub packages: Vec<RegistryPackage>,
    #[serde(default)]
    pub remotes: Vec<RegistryRemote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryPackage {
    /// "npm", "pypi", "oci", ...
    pub registry_type: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRemote {
    #[serde(rename = "type")]
    pub transport_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRepository {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryApiResponse {
    #[serde(default)]
    servers: Vec<RegistryServerWrapper>,
}

#[derive(Debug, Deserialize)]
struct RegistryServerWrapper {
    server: RegistryServer,
}

pub struct RegistryAdapter {
    client: RateLimitedClient,
    base_url: String,
}

impl RegistryAdapter {
    pub fn new(client: RateLimitedClient) -> Self {
        Self {
            client,
            base_url: REGISTRY_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for RegistryAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Web
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<McpRecord>> {
        let max = limit.clamp(1, REGISTRY_PAGE_LIMIT).to_string();
        let mut params = vec![("limit", max.as_str())];
        if !query.trim().is_empty() {
            params.push(("search", query.trim()));
        }
        let url = api_url(&servers_endpoint(&self.base_url), &params)?;

        let response = self.client.get(url).await.send().await?;
        if !response.status().is_success() {
            return Err(PlaygroundError::adapter(
                SourcePlatform::Web,
                format!("registry API returned HTTP {}", response.status()),
            ));
        }
        let data: RegistryApiResponse = response.json().await?;
        tracing::debug!("MCP Registry: {} servers for '{}'", data.servers.len(), query);

        Ok(data
            .servers
            .into_iter()
            .take(limit)
            .map(|w| registry_to_record(&w.server, &self.base_url))
            .collect())
    }
}

fn servers_endpoint(base_url: &str) -> String {
    format!("{}/{}/servers", base_url, REGISTRY_API_VERSION)
}

/// Convert a registry entry to a web-discovered record.
///
/// The source URL prefers the code repository, then the website, then the
/// first remote endpoint, so the same project surfaced by the GitHub adapter
/// deduplicates against it.
pub fn registry_to_record(server: &RegistryServer, base_url: &str) -> McpRecord {
    let source_url = server
        .repository
        .as_ref()
        .and_then(|r| r.url.clone())
        .filter(|u| !u.is_empty())
        .or_else(|| server.website_url.clone())
        .or_else(|| server.remotes.first().map(|r| r.url.clone()))
        .unwrap_or_else(|| {
            let endpoint = servers_endpoint(base_url);
            api_url(&endpoint, &[("search", server.name.as_str())])
                .map(String::from)
                .unwrap_or(endpoint)
        });

    let display_name = server
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| {
            server
                .name
                .rsplit('/')
                .next()
                .unwrap_or(&server.name)
                .to_string()
        });

    let mut record = McpRecord::discovered(
        source_url,
        SourcePlatform::Web,
        display_name.clone(),
        server.description.clone(),
    );
    record.domain = infer_domain(&display_name, &server.description);

    let mut tags: Vec<String> = Vec::new();
    for package in &server.packages {
        let kind = package.registry_type.to_lowercase();
        if !tags.contains(&kind) {
            tags.push(kind);
        }
    }
    if !server.remotes.is_empty() {
        tags.push("remote".into());
    }
    for tag in infer_tags(None, &display_name, &server.description) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    record.tags = tags;
    record.repository = server
        .repository
        .as_ref()
        .and_then(|r| r.url.as_deref())
        .and_then(|u| u.strip_prefix("https://github.com/"))
        .map(|s| s.trim_end_matches('/').to_string());
    record
}
