//! Facets over a result list that is already in view.
//!
//! Nothing here performs I/O except [`SavedSearch::replay`], which re-issues
//! its stored query through the aggregator or the catalog.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::catalog::{CatalogFilter, CatalogStore};
use crate::discovery::{Discovery, SearchRequest};
use crate::error::Result;
use crate::record::McpRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Top `top_k` tags by frequency, ties broken alphabetically.
///
/// Tags are compared trimmed and lowercased; every occurrence counts.
/// Blank or whitespace-only tags are not tags and never appear in the cloud,
/// so the counts sum to the non-blank occurrences only.
pub fn tag_cloud(records: &[McpRecord], top_k: usize) -> Vec<TagCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for tag in records.iter().flat_map(|r| r.tags.iter()) {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() {
            *counts.entry(tag).or_default() += 1;
        }
    }

    let mut cloud: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    cloud.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    cloud.truncate(top_k);
    cloud
}

/// A recommended record and how many signals it shares with the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub record: McpRecord,
    pub shared_signals: usize,
}

/// Records from `current` related to anything in `recent`.
///
/// A record qualifies when it shares its domain or at least one tag with a
/// recently viewed record. One signal per shared domain and per shared tag;
/// results are ordered by signal count, then name. Records already in
/// `recent` are never returned.
pub fn recommend(current: &[McpRecord], recent: &[McpRecord], limit: usize) -> Vec<Recommendation> {
    let seen: HashSet<String> = recent.iter().map(McpRecord::key).collect();
    let recent_domains: HashSet<String> = recent.iter().map(|r| r.domain.to_lowercase()).collect();
    let recent_tags: HashSet<String> = recent
        .iter()
        .flat_map(|r| r.tags.iter())
        .map(|t| t.trim().to_lowercase())
        .collect();

    let mut picks: Vec<Recommendation> = current
        .iter()
        .filter(|r| !seen.contains(&r.key()))
        .filter_map(|r| {
            let domain_signal = usize::from(recent_domains.contains(&r.domain.to_lowercase()));
            let tags: BTreeSet<String> = r.tags.iter().map(|t| t.trim().to_lowercase()).collect();
            let tag_signals = tags.iter().filter(|t| recent_tags.contains(*t)).count();
            let shared_signals = domain_signal + tag_signals;
            (shared_signals > 0).then(|| Recommendation {
                record: r.clone(),
                shared_signals,
            })
        })
        .collect();

    picks.sort_by(|a, b| {
        b.shared_signals
            .cmp(&a.shared_signals)
            .then_with(|| a.record.name.cmp(&b.record.name))
            .then_with(|| a.record.key().cmp(&b.record.key()))
    });
    picks.truncate(limit);
    picks
}

/// Substring/domain/tag narrowing of a list already in view.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LocalFilter {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LocalFilter {
    pub fn matches(&self, record: &McpRecord) -> bool {
        if let Some(text) = self
            .text
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
        {
            let hit = record.name.to_lowercase().contains(&text)
                || record.description.to_lowercase().contains(&text)
                || record.tags.iter().any(|t| t.to_lowercase().contains(&text));
            if !hit {
                return false;
            }
        }
        if let Some(domain) = self
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("all"))
        {
            if !record.domain.eq_ignore_ascii_case(domain) {
                return false;
            }
        }
        self.tags.iter().all(|t| record.has_tag(t.trim()))
    }

    pub fn apply(&self, records: Vec<McpRecord>) -> Vec<McpRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// What a saved search re-issues when replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "criteria", rename_all = "snake_case")]
pub enum SavedQuery {
    Web(SearchRequest),
    Catalog(CatalogFilter),
}

/// An immutable snapshot of a query and its filter criteria.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedSearch {
    id: String,
    name: String,
    query: SavedQuery,
    created_at: String,
}

impl SavedSearch {
    pub fn new(name: impl Into<String>, query: SavedQuery) -> Self {
        let name = name.into();
        let now = chrono::Utc::now();
        let created_at = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(serde_json::to_vec(&query).unwrap_or_default());
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        let digest = hex::encode(hasher.finalize());

        Self {
            id: format!("search-{}", &digest[..12]),
            name,
            query,
            created_at,
        }
    }

    pub(crate) fn restore(id: String, name: String, query: SavedQuery, created_at: String) -> Self {
        Self {
            id,
            name,
            query,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> &SavedQuery {
        &self.query
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Re-run the stored query verbatim. Never served from a cache.
    pub async fn replay(&self, discovery: &Discovery, catalog: &CatalogStore) -> Result<Vec<McpRecord>> {
        tracing::debug!("Replaying saved search {} ({})", self.id, self.name);
        match &self.query {
            SavedQuery::Web(request) => Ok(discovery.aggregate(request).await),
            SavedQuery::Catalog(filter) => catalog.list(filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SortBy;
    use crate::discovery::scoring::ConfidenceScorer;
    use crate::discovery::sources::SourceAdapter;
    use crate::record::SourcePlatform;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn record(name: &str, domain: &str, tags: &[&str]) -> McpRecord {
        let mut r = McpRecord::discovered(
            format!("https://github.com/x/{}", name),
            SourcePlatform::Github,
            name,
            format!("{} tools", name),
        );
        r.domain = domain.to_string();
        r.tags = tags.iter().map(|t| t.to_string()).collect();
        r
    }

    #[test]
    fn test_tag_cloud_counts_and_order() {
        let records = vec![
            record("a", "weather", &["weather", "api"]),
            record("b", "weather", &["weather", "api"]),
            record("c", "weather", &["Weather"]),
            record("d", "weather", &["weather ", "forecast"]),
        ];
        let cloud = tag_cloud(&records, 10);
        assert_eq!(cloud[0], TagCount { tag: "weather".into(), count: 4 });
        assert_eq!(cloud[1], TagCount { tag: "api".into(), count: 2 });
        assert_eq!(cloud[2], TagCount { tag: "forecast".into(), count: 1 });

        let total: usize = cloud.iter().map(|t| t.count).sum();
        let occurrences: usize = records.iter().map(|r| r.tags.len()).sum();
        assert_eq!(total, occurrences);
    }

    #[test]
    fn test_tag_cloud_skips_blank_tags() {
        let records = vec![
            record("a", "weather", &["weather", "", "  "]),
            record("b", "weather", &["\t", "weather"]),
        ];
        let cloud = tag_cloud(&records, 10);
        assert_eq!(cloud, vec![TagCount { tag: "weather".into(), count: 2 }]);

        let total: usize = cloud.iter().map(|t| t.count).sum();
        let non_blank: usize = records
            .iter()
            .flat_map(|r| r.tags.iter())
            .filter(|t| !t.trim().is_empty())
            .count();
        assert_eq!(total, non_blank);
    }

    #[test]
    fn test_tag_cloud_ties_are_alphabetical_and_truncated() {
        let records = vec![record("a", "x", &["zeta", "alpha", "mid"])];
        let cloud = tag_cloud(&records, 2);
        let tags: Vec<&str> = cloud.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(tags, vec!["alpha", "mid"]);
        assert!(tag_cloud(&[], 5).is_empty());
    }

    #[test]
    fn test_recommend_excludes_recent_and_ranks_by_signals() {
        let viewed = record("weather-a", "weather", &["api", "forecast"]);
        let current = vec![
            viewed.clone(),
            record("storm", "weather", &["api", "forecast"]),
            record("rain", "weather", &[]),
            record("pay", "finance", &["api"]),
            record("chat", "communication", &["slack"]),
        ];

        let picks = recommend(&current, std::slice::from_ref(&viewed), 10);
        let names: Vec<&str> = picks.iter().map(|p| p.record.name.as_str()).collect();
        assert_eq!(names, vec!["storm", "pay", "rain"]);
        assert_eq!(picks[0].shared_signals, 3);
        assert!(picks.iter().all(|p| p.record.key() != viewed.key()));
    }

    #[test]
    fn test_recommend_with_empty_history() {
        let current = vec![record("a", "weather", &["api"])];
        assert!(recommend(&current, &[], 5).is_empty());
    }

    #[test]
    fn test_local_filter() {
        let records = vec![
            record("weather-mcp", "weather", &["api"]),
            record("stocks", "finance", &["api", "realtime"]),
            record("calendar", "productivity", &[]),
        ];

        let by_text = LocalFilter {
            text: Some("STOCK".into()),
            ..LocalFilter::default()
        };
        assert_eq!(by_text.apply(records.clone()).len(), 1);

        let by_tags = LocalFilter {
            tags: vec!["api".into(), "realtime".into()],
            ..LocalFilter::default()
        };
        assert_eq!(by_tags.apply(records.clone())[0].name, "stocks");

        let all = LocalFilter {
            domain: Some("all".into()),
            ..LocalFilter::default()
        };
        assert_eq!(all.apply(records).len(), 3);
    }

    struct CountingAdapter(AtomicUsize);

    #[async_trait]
    impl SourceAdapter for CountingAdapter {
        fn platform(&self) -> SourcePlatform {
            SourcePlatform::Github
        }

        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<McpRecord>> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![record(&format!("{}-{}", query, n), "weather", &[])])
        }
    }

    #[tokio::test]
    async fn test_replay_reissues_query() {
        let adapter = Arc::new(CountingAdapter(AtomicUsize::new(0)));
        let discovery = Discovery::new(
            vec![adapter.clone()],
            ConfidenceScorer::default(),
            Duration::from_secs(1),
        );
        let catalog = CatalogStore::open_in_memory().unwrap();
        let saved = SavedSearch::new(
            "weather",
            SavedQuery::Web(SearchRequest::new("weather", [SourcePlatform::Github])),
        );

        let first = saved.replay(&discovery, &catalog).await.unwrap();
        let second = saved.replay(&discovery, &catalog).await.unwrap();
        assert_eq!(adapter.0.load(Ordering::SeqCst), 2);
        assert_eq!(first[0].name, "weather-0");
        assert_eq!(second[0].name, "weather-1");
    }

    #[tokio::test]
    async fn test_saved_catalog_search_round_trips_through_store() {
        let catalog = CatalogStore::open_in_memory().unwrap();
        catalog.seed_samples().unwrap();
        let discovery = Discovery::new(Vec::new(), ConfidenceScorer::default(), Duration::from_secs(1));

        let saved = SavedSearch::new(
            "top weather",
            SavedQuery::Catalog(CatalogFilter {
                domain: Some("weather".into()),
                sort_by: SortBy::Name,
                ..CatalogFilter::default()
            }),
        );
        catalog.save_search(&saved).unwrap();

        let loaded = catalog.get_saved_search(saved.id()).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(catalog.list_saved_searches().unwrap().len(), 1);

        let results = loaded.replay(&discovery, &catalog).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "weather.forecast");
    }
}
