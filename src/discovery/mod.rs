//! Web discovery: source adapters, schema fetching, scoring and the
//! aggregator that merges per-platform results into one ranked list.

pub mod extract;
pub mod fetch;
pub mod scoring;
pub mod sources;
pub mod validate;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::record::{McpRecord, SourcePlatform};
use scoring::ConfidenceScorer;
use sources::SourceAdapter;

/// Hosts whose paths are case-insensitive and never carry meaningful queries.
const CASE_INSENSITIVE_HOSTS: &[&str] = &["github.com", "huggingface.co", "gitlab.com"];

/// One aggregated web search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub sources: BTreeSet<SourcePlatform>,
    #[serde(default)]
    pub min_confidence: f64,
    pub limit: usize,
    /// Restrict results to these domains. Empty means all.
    #[serde(default)]
    pub domains: Vec<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, sources: impl IntoIterator<Item = SourcePlatform>) -> Self {
        Self {
            query: query.into(),
            sources: sources.into_iter().collect(),
            min_confidence: 0.0,
            limit: 20,
            domains: Vec::new(),
        }
    }
}

/// Fans a query out to the enabled source adapters and merges the results.
pub struct Discovery {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    scorer: ConfidenceScorer,
    adapter_timeout: Duration,
}

impl Discovery {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        scorer: ConfidenceScorer,
        adapter_timeout: Duration,
    ) -> Self {
        Self {
            adapters,
            scorer,
            adapter_timeout,
        }
    }

    /// Platforms that have an adapter configured.
    pub fn platforms(&self) -> Vec<SourcePlatform> {
        let set: BTreeSet<SourcePlatform> = self.adapters.iter().map(|a| a.platform()).collect();
        set.into_iter().collect()
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    /// Run one search across the requested platforms.
    ///
    /// Adapter failures and timeouts contribute nothing; they never fail the
    /// search. The returned list is scored, deduplicated by normalized source
    /// URL, filtered by `min_confidence` and `domains`, ranked, and truncated
    /// to `limit`.
    pub async fn aggregate(&self, request: &SearchRequest) -> Vec<McpRecord> {
        if request.sources.is_empty() || request.limit == 0 {
            return Vec::new();
        }

        let selected: Vec<&Arc<dyn SourceAdapter>> = self
            .adapters
            .iter()
            .filter(|a| request.sources.contains(&a.platform()))
            .collect();
        if selected.is_empty() {
            tracing::debug!("No configured adapter for {:?}", request.sources);
            return Vec::new();
        }

        let calls = selected.iter().map(|adapter| async move {
            let platform = adapter.platform();
            match tokio::time::timeout(
                self.adapter_timeout,
                adapter.search(&request.query, request.limit),
            )
            .await
            {
                Ok(Ok(records)) => {
                    tracing::debug!("{} returned {} records", platform, records.len());
                    records
                }
                Ok(Err(e)) => {
                    tracing::warn!("{} search failed: {}", platform, e);
                    Vec::new()
                }
                Err(_) => {
                    tracing::warn!(
                        "{} search timed out after {:?}",
                        platform,
                        self.adapter_timeout
                    );
                    Vec::new()
                }
            }
        });
        let batches = futures::future::join_all(calls).await;

        let mut best: BTreeMap<String, McpRecord> = BTreeMap::new();
        for mut record in batches.into_iter().flatten() {
            self.scorer.apply(&request.query, &mut record);
            let key = record
                .source_url()
                .map(normalize_source_url)
                .unwrap_or_else(|| record.key());
            match best.get(&key) {
                Some(existing) if rank_cmp(&record, existing) != Ordering::Less => {}
                _ => {
                    best.insert(key, record);
                }
            }
        }

        let domains: Vec<String> = request
            .domains
            .iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty() && d != "all")
            .collect();

        let mut results: Vec<McpRecord> = best
            .into_values()
            .filter(|r| r.score() >= request.min_confidence)
            .filter(|r| domains.is_empty() || domains.contains(&r.domain.to_lowercase()))
            .collect();
        results.sort_by(rank_cmp);
        results.truncate(request.limit);

        tracing::info!(
            "Search '{}' across {} sources: {} results",
            request.query,
            selected.len(),
            results.len()
        );
        results
    }
}

/// Ranking order: score desc, popularity desc (present before absent),
/// name asc, then identity and platform so the order is total.
pub fn rank_cmp(a: &McpRecord, b: &McpRecord) -> Ordering {
    b.score()
        .total_cmp(&a.score())
        .then_with(|| b.popularity.cmp(&a.popularity))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.key().cmp(&b.key()))
        .then_with(|| a.source_platform.cmp(&b.source_platform))
}

/// Canonical form of a source URL used as the dedup key.
///
/// Scheme is forced to https, a leading `www.` is dropped, fragments and
/// trailing slashes are removed. Repository hosts additionally drop the query,
/// a `.git` suffix and path case.
pub fn normalize_source_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(url) = Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_lowercase();
    };

    let host = url
        .host_str()
        .unwrap_or_default()
        .trim_start_matches("www.")
        .to_lowercase();
    let repo_host = CASE_INSENSITIVE_HOSTS.contains(&host.as_str());

    let mut path = url.path().trim_end_matches('/').to_string();
    if repo_host {
        path = path.trim_end_matches(".git").to_lowercase();
    }

    let mut normalized = format!("https://{}", host);
    if let Some(port) = url.port() {
        normalized.push_str(&format!(":{}", port));
    }
    normalized.push_str(&path);
    if !repo_host {
        if let Some(query) = url.query().filter(|q| !q.is_empty()) {
            normalized.push('?');
            normalized.push_str(query);
        }
    }
    normalized
}
