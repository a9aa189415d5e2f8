//! `/mcps` endpoints: catalog listing, web search, import and facets.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{check_confidence, check_limit, split_csv};
use crate::catalog::import::import_from_url;
use crate::catalog::{CatalogFilter, SortBy, DEFAULT_LIST_LIMIT};
use crate::discovery::SearchRequest;
use crate::error::{PlaygroundError, Result};
use crate::facets::{self, LocalFilter, Recommendation, TagCount};
use crate::notify::{NoticeKind, NotificationSink};
use crate::record::{McpRecord, SourcePlatform};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 20;
const DEFAULT_TOP_K: usize = 20;

/// A web-discovered MCP as returned by the search endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebMcpResult {
    pub name: String,
    pub description: String,
    pub source_url: String,
    pub tags: Vec<String>,
    pub domain: String,
    pub validated: bool,
    pub schema: Option<serde_json::Value>,
    pub file_type: String,
    pub repository: Option<String>,
    pub stars: Option<u64>,
    pub source_platform: SourcePlatform,
    pub confidence_score: f64,
}

impl From<McpRecord> for WebMcpResult {
    fn from(record: McpRecord) -> Self {
        Self {
            source_url: record.source_url().unwrap_or_default().to_string(),
            confidence_score: record.score(),
            name: record.name,
            description: record.description,
            tags: record.tags,
            domain: record.domain,
            validated: record.validated,
            schema: record.schema,
            file_type: record.file_type,
            repository: record.repository,
            stars: record.stars,
            source_platform: record.source_platform,
        }
    }
}

/// A catalog record as returned by the listing endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct McpListItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub domain: String,
    pub validated: bool,
    pub popularity: i64,
    pub source_url: Option<String>,
    pub source_platform: SourcePlatform,
    pub file_type: String,
    pub repository: Option<String>,
    pub stars: Option<u64>,
    pub created_at: Option<String>,
}

impl From<McpRecord> for McpListItem {
    fn from(record: McpRecord) -> Self {
        Self {
            id: record.catalog_id().unwrap_or_default().to_string(),
            source_url: record.source_url().map(str::to_string),
            popularity: record.popularity.unwrap_or_default(),
            name: record.name,
            description: record.description,
            tags: record.tags,
            domain: record.domain,
            validated: record.validated,
            source_platform: record.source_platform,
            file_type: record.file_type,
            repository: record.repository,
            stars: record.stars,
            created_at: record.created_at,
        }
    }
}

/// Full catalog record, including its schema.
#[derive(Debug, Serialize)]
pub struct McpDetail {
    #[serde(flatten)]
    pub item: McpListItem,
    pub schema: Option<serde_json::Value>,
}

impl From<McpRecord> for McpDetail {
    fn from(mut record: McpRecord) -> Self {
        let schema = record.schema.take();
        Self {
            item: record.into(),
            schema,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub domain: Option<String>,
    /// Comma-separated; every tag must match.
    pub tags: Option<String>,
    pub validated: Option<bool>,
    pub sort_by: Option<String>,
    pub limit: Option<usize>,
    /// Substring filter over name, description and tags.
    pub q: Option<String>,
}

impl ListParams {
    fn filter(&self) -> Result<CatalogFilter> {
        Ok(CatalogFilter {
            domain: self.domain.clone(),
            tags: split_csv(self.tags.as_deref()),
            validated: self.validated,
            sort_by: match self.sort_by.as_deref() {
                Some(s) => s.parse()?,
                None => SortBy::default(),
            },
            limit: check_limit(self.limit.unwrap_or(DEFAULT_LIST_LIMIT))?,
        })
    }

    fn local(&self) -> LocalFilter {
        LocalFilter {
            text: self.q.clone(),
            ..LocalFilter::default()
        }
    }
}

/// GET /mcps
pub async fn list_mcps(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<McpListItem>>> {
    let records = state.catalog.list(&params.filter()?)?;
    let records = params.local().apply(records);
    Ok(Json(records.into_iter().map(McpListItem::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
    /// Comma-separated platform names. Absent means every enabled platform.
    pub sources: Option<String>,
    pub min_confidence: Option<f64>,
    pub use_scraping: Option<bool>,
}

/// Platforms named in a request that are both known and enabled.
fn requested_platforms(state: &AppState, names: Option<&[String]>) -> BTreeSet<SourcePlatform> {
    let enabled = state.settings.enabled_platforms();
    match names {
        None => enabled.into_iter().collect(),
        Some(names) => names
            .iter()
            .filter_map(|name| match name.parse::<SourcePlatform>() {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::debug!("Ignoring source: {}", e);
                    None
                }
            })
            .filter(|p| enabled.contains(p))
            .collect(),
    }
}

async fn run_search(
    state: &AppState,
    request: SearchRequest,
    use_scraping: bool,
) -> Vec<WebMcpResult> {
    if !use_scraping || !state.settings.scraping_enabled {
        tracing::info!("Web discovery disabled, returning no results");
        return Vec::new();
    }
    let records = state.discovery.aggregate(&request).await;
    if records.is_empty() {
        state.events.notify(
            NoticeKind::Info,
            &format!("No MCPs found for '{}'", request.query),
        );
    }
    records.into_iter().map(WebMcpResult::from).collect()
}

/// GET /mcps/search
pub async fn search_mcps(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<WebMcpResult>>> {
    let names = params.sources.as_deref().map(|s| split_csv(Some(s)));
    let request = SearchRequest {
        query: params.query.trim().to_string(),
        sources: requested_platforms(&state, names.as_deref()),
        min_confidence: check_confidence(params.min_confidence.unwrap_or(0.0))?,
        limit: check_limit(params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))?,
        domains: Vec::new(),
    };
    Ok(Json(
        run_search(&state, request, params.use_scraping.unwrap_or(true)).await,
    ))
}

#[derive(Debug, Deserialize)]
pub struct EnhancedSearchBody {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
    pub sources: Option<Vec<String>>,
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub domains: Vec<String>,
    pub use_web_scraping: Option<bool>,
}

/// POST /mcps/search/enhanced
pub async fn enhanced_search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnhancedSearchBody>,
) -> Result<Json<Vec<WebMcpResult>>> {
    let request = SearchRequest {
        query: body.query.trim().to_string(),
        sources: requested_platforms(&state, body.sources.as_deref()),
        min_confidence: check_confidence(body.min_confidence.unwrap_or(0.0))?,
        limit: check_limit(body.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))?,
        domains: body.domains,
    };
    Ok(Json(
        run_search(&state, request, body.use_web_scraping.unwrap_or(true)).await,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub source_url: String,
    pub auto_validate: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub id: String,
    pub name: String,
    pub validated: bool,
    pub domain: String,
    pub tags: Vec<String>,
    pub popularity: i64,
    /// False when the URL was already in the catalog.
    pub created: bool,
    pub message: String,
}

/// POST /mcps/import-from-web
pub async fn import_from_web(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportParams>,
) -> Result<(StatusCode, Json<ImportResponse>)> {
    let outcome = import_from_url(
        &state.catalog,
        state.fetcher.as_ref(),
        &params.source_url,
        params.auto_validate.unwrap_or(true),
        state.settings.import_popularity_seed,
    )
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            state.events.notify(
                NoticeKind::Error,
                &format!("Import of {} failed: {}", params.source_url, e),
            );
            return Err(e);
        }
    };

    let record = outcome.record;
    let message = if outcome.created {
        format!("Imported {}", record.name)
    } else {
        format!("{} is already in the catalog", record.name)
    };
    state.events.notify(NoticeKind::Success, &message);

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ImportResponse {
            id: record.catalog_id().unwrap_or_default().to_string(),
            popularity: record.popularity.unwrap_or_default(),
            name: record.name,
            validated: record.validated,
            domain: record.domain,
            tags: record.tags,
            created: outcome.created,
            message,
        }),
    ))
}

/// GET /mcps/{id}
pub async fn get_mcp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<McpDetail>> {
    state
        .catalog
        .get(&id)?
        .map(|r| Json(r.into()))
        .ok_or_else(|| PlaygroundError::NotFound(format!("MCP '{}'", id)))
}

/// DELETE /mcps/{id}
pub async fn delete_mcp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if state.catalog.delete(&id)? {
        tracing::info!("Deleted catalog record {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(PlaygroundError::NotFound(format!("MCP '{}'", id)))
    }
}

/// POST /mcps/{id}/use
pub async fn use_mcp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<McpListItem>> {
    state
        .catalog
        .record_usage(&id)?
        .map(|r| Json(r.into()))
        .ok_or_else(|| PlaygroundError::NotFound(format!("MCP '{}'", id)))
}

#[derive(Debug, Default, Deserialize)]
pub struct TagParams {
    pub top_k: Option<usize>,
    pub domain: Option<String>,
    pub tags: Option<String>,
    pub validated: Option<bool>,
    pub q: Option<String>,
}

impl TagParams {
    fn list_params(&self) -> ListParams {
        ListParams {
            domain: self.domain.clone(),
            tags: self.tags.clone(),
            validated: self.validated,
            sort_by: None,
            limit: Some(super::MAX_LIMIT),
            q: self.q.clone(),
        }
    }
}

/// GET /mcps/tags
pub async fn tag_cloud(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TagParams>,
) -> Result<Json<Vec<TagCount>>> {
    let list = params.list_params();
    let records = state.catalog.list(&list.filter()?)?;
    let records = list.local().apply(records);
    Ok(Json(facets::tag_cloud(
        &records,
        params.top_k.unwrap_or(DEFAULT_TOP_K),
    )))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationBody {
    /// Catalog IDs of recently viewed records, most recent first.
    pub recent_ids: Vec<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationItem {
    #[serde(flatten)]
    pub item: McpListItem,
    pub shared_signals: usize,
}

/// POST /mcps/recommendations
pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecommendationBody>,
) -> Result<Json<Vec<RecommendationItem>>> {
    let limit = check_limit(body.limit.unwrap_or(5))?;
    let current = state.catalog.list(&CatalogFilter {
        limit: super::MAX_LIMIT,
        ..CatalogFilter::default()
    })?;
    // Viewed records resolve against the whole catalog, not just the candidate window.
    let recent = body
        .recent_ids
        .iter()
        .filter_map(|id| state.catalog.get(id).transpose())
        .collect::<Result<Vec<McpRecord>>>()?;

    let picks: Vec<Recommendation> = facets::recommend(&current, &recent, limit);
    Ok(Json(
        picks
            .into_iter()
            .map(|p| RecommendationItem {
                item: p.record.into(),
                shared_signals: p.shared_signals,
            })
            .collect(),
    ))
}
