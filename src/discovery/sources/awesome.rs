//! Curated "awesome" lists: markdown READMEs whose list items link to MCP
//! server repositories.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use super::{fetch_schemas, SourceAdapter};
use crate::discovery::extract::{infer_domain, infer_tags, record_from_document};
use crate::discovery::fetch::{FetchedDocument, RateLimitedClient, SchemaFetcher};
use crate::discovery::scoring::query_terms;
use crate::error::{PlaygroundError, Result};
use crate::record::{McpRecord, SourcePlatform};

const SCHEMA_FETCH_LIMIT: usize = 5;
const REPO_HOSTS: &[&str] = &["https://github.com/", "https://gitlab.com/"];

/// One linked entry of an awesome list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub title: String,
    pub url: String,
    pub description: String,
    /// Text of the closest heading above the entry.
    pub section: String,
}

impl ListEntry {
    fn matches(&self, terms: &[String]) -> bool {
        if terms.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {} {}",
            self.title.to_lowercase(),
            self.description.to_lowercase(),
            self.section.to_lowercase()
        );
        terms.iter().any(|t| haystack.contains(t.as_str()))
    }
}

#[derive(Default)]
struct PendingItem {
    title: String,
    url: Option<String>,
    description: String,
    in_link: bool,
}

/// Extract linked repository entries from an awesome-list README.
///
/// The first repository link of each list item becomes the entry; text after
/// the link is its description. Items without a repository link are skipped.
pub fn parse_awesome_list(markdown: &str) -> Vec<ListEntry> {
    let mut entries = Vec::new();
    let mut items: Vec<PendingItem> = Vec::new();
    let mut section = String::new();
    let mut heading: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { .. }) => heading = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = heading.take() {
                    section = text.trim().to_string();
                }
            }
            Event::Start(Tag::Item) => items.push(PendingItem::default()),
            Event::End(TagEnd::Item) => {
                if let Some(item) = items.pop() {
                    if let Some(url) = item.url {
                        entries.push(ListEntry {
                            title: clean_title(&item.title),
                            url,
                            description: clean_description(&item.description),
                            section: section.clone(),
                        });
                    }
                }
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                if let Some(item) = items.last_mut() {
                    if item.url.is_none() && is_repo_link(&dest_url) {
                        item.url = Some(dest_url.trim_end_matches('/').to_string());
                        item.in_link = true;
                    }
                }
            }
            Event::End(TagEnd::Link) => {
                if let Some(item) = items.last_mut() {
                    item.in_link = false;
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(h) = heading.as_mut() {
                    h.push_str(&text);
                } else if let Some(item) = items.last_mut() {
                    if item.in_link {
                        item.title.push_str(&text);
                    } else if item.url.is_some() {
                        item.description.push_str(&text);
                    }
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(item) = items.last_mut() {
                    if item.url.is_some() && !item.in_link {
                        item.description.push(' ');
                    }
                }
            }
            _ => {}
        }
    }

    entries
}

fn is_repo_link(url: &str) -> bool {
    REPO_HOSTS.iter().any(|host| {
        url.strip_prefix(host)
            .map(|rest| rest.split('/').filter(|s| !s.is_empty()).count() >= 2)
            .unwrap_or(false)
    })
}

fn clean_title(title: &str) -> String {
    title
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim()
        .to_string()
}

fn clean_description(description: &str) -> String {
    description
        .trim()
        .trim_start_matches(['-', ':', '–', '—'])
        .trim()
        .to_string()
}

pub struct AwesomeListAdapter {
    client: RateLimitedClient,
    fetcher: Arc<dyn SchemaFetcher>,
    lists: Vec<String>,
    schema_timeout: Duration,
}

impl AwesomeListAdapter {
    pub fn new(
        client: RateLimitedClient,
        fetcher: Arc<dyn SchemaFetcher>,
        lists: Vec<String>,
        schema_timeout: Duration,
    ) -> Self {
        Self {
            client,
            fetcher,
            lists,
            schema_timeout,
        }
    }

    async fn records_for(&self, entries: &[ListEntry]) -> Vec<McpRecord> {
        let urls: Vec<String> = entries
            .iter()
            .take(SCHEMA_FETCH_LIMIT)
            .map(|e| e.url.clone())
            .collect();
        let mut schemas = fetch_schemas(self.fetcher.as_ref(), &urls, self.schema_timeout).await;
        schemas.resize(entries.len(), None);

        entries
            .iter()
            .zip(schemas)
            .map(|(entry, fetched)| listed_record(entry, fetched))
            .collect()
    }

    async fn fetch_list(&self, url: &str) -> Result<Vec<ListEntry>> {
        let response = self.client.get(url).await.send().await?;
        if !response.status().is_success() {
            return Err(PlaygroundError::adapter(
                SourcePlatform::Awesome,
                format!("{} returned HTTP {}", url, response.status()),
            ));
        }
        let body = response.text().await?;
        Ok(parse_awesome_list(&body))
    }
}

#[async_trait]
impl SourceAdapter for AwesomeListAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Awesome
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<McpRecord>> {
        let terms = query_terms(query);
        let mut entries: Vec<ListEntry> = Vec::new();
        let mut failures = 0usize;

        for list in &self.lists {
            match self.fetch_list(list).await {
                Ok(found) => {
                    for entry in found {
                        if entry.matches(&terms) && !entries.iter().any(|e| e.url == entry.url) {
                            entries.push(entry);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Awesome list {} unavailable: {}", list, e);
                    failures += 1;
                }
            }
            if entries.len() >= limit {
                break;
            }
        }

        if failures > 0 && failures == self.lists.len() {
            return Err(PlaygroundError::adapter(
                SourcePlatform::Awesome,
                "no awesome list could be fetched",
            ));
        }

        entries.truncate(limit);
        tracing::debug!("Awesome lists: {} entries for '{}'", entries.len(), query);

        Ok(self.records_for(&entries).await)
    }
}

fn listed_record(entry: &ListEntry, fetched: Option<FetchedDocument>) -> McpRecord {
    let mut record = match fetched {
        Some(doc) => record_from_document(
            &entry.url,
            SourcePlatform::Awesome,
            &entry.title,
            doc.document,
            doc.file_type,
        ),
        None => entry_to_record(entry),
    };
    if record.description.is_empty() {
        record.description = entry.description.clone();
    }
    record
}

fn entry_to_record(entry: &ListEntry) -> McpRecord {
    let mut record = McpRecord::discovered(
        &entry.url,
        SourcePlatform::Awesome,
        &entry.title,
        &entry.description,
    );
    let domain = infer_domain(&entry.title, &entry.description);
    record.domain = if domain == "general" {
        infer_domain(&entry.section, "")
    } else {
        domain
    };
    record.tags = infer_tags(None, &entry.title, &entry.description);
    record.repository = entry
        .url
        .strip_prefix("https://github.com/")
        .map(|s| s.to_string());
    record
}
