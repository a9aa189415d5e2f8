//! GitHub source: repository search API plus a schema lookup per repository.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{api_url, fetch_schemas, SourceAdapter};
use crate::discovery::extract::{infer_domain, infer_tags, record_from_document};
use crate::discovery::fetch::{FetchedDocument, RateLimitedClient, SchemaFetcher};
use crate::error::{PlaygroundError, Result};
use crate::record::{McpRecord, SourcePlatform};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// Repositories checked for a schema file per search. The rest are returned
/// with repository metadata only.
const SCHEMA_FETCH_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct RepoSearchResponse {
    #[serde(default)]
    items: Vec<RepoItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct RepoItem {
    name: String,
    full_name: String,
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    topics: Vec<String>,
}

pub struct GithubAdapter {
    client: RateLimitedClient,
    fetcher: Arc<dyn SchemaFetcher>,
    token: Option<String>,
    schema_timeout: Duration,
}

impl GithubAdapter {
    pub fn new(
        client: RateLimitedClient,
        fetcher: Arc<dyn SchemaFetcher>,
        token: Option<String>,
        schema_timeout: Duration,
    ) -> Self {
        Self {
            client,
            fetcher,
            token,
            schema_timeout,
        }
    }

    async fn search_repositories(&self, query: &str, limit: usize) -> Result<Vec<RepoItem>> {
        let q = if query.trim().is_empty() {
            "mcp server".to_string()
        } else {
            format!("{} mcp", query.trim())
        };
        let per_page = limit.clamp(1, 100).to_string();
        let url = api_url(
            &format!("{}/search/repositories", GITHUB_API_BASE),
            &[
                ("q", q.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ],
        )?;

        let mut request = self
            .client
            .get(url)
            .await
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            return Err(PlaygroundError::adapter(
                SourcePlatform::Github,
                "rate limit exceeded",
            ));
        }
        if !status.is_success() {
            return Err(PlaygroundError::adapter(
                SourcePlatform::Github,
                format!("search returned HTTP {}", status),
            ));
        }

        let data: RepoSearchResponse = response.json().await?;
        Ok(data.items)
    }

    /// Check the leading repositories for schema files and build records.
    /// Repositories whose lookup fails or times out keep their metadata.
    async fn records_for(&self, items: Vec<RepoItem>, limit: usize) -> Vec<McpRecord> {
        let urls: Vec<String> = items
            .iter()
            .take(SCHEMA_FETCH_LIMIT.min(limit))
            .map(|item| item.html_url.clone())
            .collect();
        let mut schemas = fetch_schemas(self.fetcher.as_ref(), &urls, self.schema_timeout).await;
        schemas.resize(items.len(), None);

        items
            .into_iter()
            .zip(schemas)
            .take(limit)
            .map(|(item, schema)| repo_to_record(item, schema))
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Github
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<McpRecord>> {
        let items = self.search_repositories(query, limit).await?;
        tracing::debug!("GitHub: {} repositories for '{}'", items.len(), query);

        Ok(self.records_for(items, limit).await)
    }
}

fn repo_to_record(item: RepoItem, fetched: Option<FetchedDocument>) -> McpRecord {
    let repo_description = item.description.clone().unwrap_or_default();

    let mut record = match fetched {
        Some(doc) => {
            let mut record = record_from_document(
                &item.html_url,
                SourcePlatform::Github,
                &item.name,
                doc.document,
                doc.file_type,
            );
            if record.description.is_empty() {
                record.description = repo_description;
            }
            record
        }
        None => {
            let mut record = McpRecord::discovered(
                &item.html_url,
                SourcePlatform::Github,
                &item.name,
                &repo_description,
            );
            record.domain = infer_domain(&item.name, &repo_description);
            record.tags = infer_tags(None, &item.name, &repo_description);
            record
        }
    };

    let mut tags: Vec<String> = item
        .topics
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    for tag in std::mem::take(&mut record.tags) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    record.tags = tags;
    record.repository = Some(item.full_name);
    record.stars = Some(item.stargazers_count);
    record
}
