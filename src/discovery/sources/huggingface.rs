//! Hugging Face source: Spaces tagged as MCP servers, searched via the Hub API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{api_url, fetch_schemas, SourceAdapter};
use crate::discovery::extract::{infer_domain, infer_tags, record_from_document};
use crate::discovery::fetch::{FetchedDocument, RateLimitedClient, SchemaFetcher};
use crate::error::{PlaygroundError, Result};
use crate::record::{McpRecord, SourcePlatform};

const HF_API_BASE: &str = "https://huggingface.co/api";
const MCP_SPACE_TAG: &str = "mcp-server";
const SCHEMA_FETCH_LIMIT: usize = 5;

#[derive(Debug, Clone, Deserialize)]
struct SpaceItem {
    id: String,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    tags: Vec<String>,
}

impl SpaceItem {
    fn repo_name(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }

    fn page_url(&self) -> String {
        format!("https://huggingface.co/spaces/{}", self.id)
    }
}

pub struct HuggingFaceAdapter {
    client: RateLimitedClient,
    fetcher: Arc<dyn SchemaFetcher>,
    schema_timeout: Duration,
}

impl HuggingFaceAdapter {
    pub fn new(
        client: RateLimitedClient,
        fetcher: Arc<dyn SchemaFetcher>,
        schema_timeout: Duration,
    ) -> Self {
        Self {
            client,
            fetcher,
            schema_timeout,
        }
    }

    async fn records_for(&self, spaces: Vec<SpaceItem>, limit: usize) -> Vec<McpRecord> {
        let spaces: Vec<SpaceItem> = spaces.into_iter().take(limit).collect();
        let urls: Vec<String> = spaces
            .iter()
            .take(SCHEMA_FETCH_LIMIT)
            .map(SpaceItem::page_url)
            .collect();
        let mut schemas = fetch_schemas(self.fetcher.as_ref(), &urls, self.schema_timeout).await;
        schemas.resize(spaces.len(), None);

        spaces
            .iter()
            .zip(schemas)
            .map(|(space, fetched)| space_record(space, fetched))
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for HuggingFaceAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Huggingface
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<McpRecord>> {
        let max = limit.clamp(1, 100).to_string();
        let url = api_url(
            &format!("{}/spaces", HF_API_BASE),
            &[
                ("search", query.trim()),
                ("filter", MCP_SPACE_TAG),
                ("limit", max.as_str()),
            ],
        )?;
        let response = self.client.get(url).await.send().await?;
        if !response.status().is_success() {
            return Err(PlaygroundError::adapter(
                SourcePlatform::Huggingface,
                format!("Hub API returned HTTP {}", response.status()),
            ));
        }
        let spaces: Vec<SpaceItem> = response.json().await?;
        tracing::debug!("Hugging Face: {} spaces for '{}'", spaces.len(), query);

        Ok(self.records_for(spaces, limit).await)
    }
}

fn space_record(space: &SpaceItem, fetched: Option<FetchedDocument>) -> McpRecord {
    let mut record = match fetched {
        Some(doc) => record_from_document(
            &space.page_url(),
            SourcePlatform::Huggingface,
            space.repo_name(),
            doc.document,
            doc.file_type,
        ),
        None => space_to_record(space),
    };
    record.repository = Some(space.id.clone());
    record.stars = Some(space.likes);
    record
}

fn space_to_record(space: &SpaceItem) -> McpRecord {
    let name = space.repo_name().to_string();
    let mut record = McpRecord::discovered(
        space.page_url(),
        SourcePlatform::Huggingface,
        name.clone(),
        String::new(),
    );
    record.domain = infer_domain(&name, "");
    let mut tags: Vec<String> = space
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && !t.contains(':') && t != MCP_SPACE_TAG)
        .collect();
    for tag in infer_tags(None, &name, "") {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    record.tags = tags;
    record
}
