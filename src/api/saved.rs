//! `/saved-searches` endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::mcps::{McpListItem, WebMcpResult};
use super::{check_confidence, check_limit};
use crate::error::{PlaygroundError, Result};
use crate::facets::{SavedQuery, SavedSearch};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSavedSearchBody {
    pub name: String,
    /// `web` or `catalog`.
    pub kind: String,
    pub criteria: Value,
}

impl CreateSavedSearchBody {
    fn into_search(self) -> Result<SavedSearch> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(PlaygroundError::InvalidRequest(
                "saved search name must not be empty".into(),
            ));
        }
        let query: SavedQuery =
            serde_json::from_value(json!({ "kind": self.kind, "criteria": self.criteria }))
                .map_err(|e| {
                    PlaygroundError::InvalidRequest(format!("invalid saved search: {}", e))
                })?;
        match &query {
            SavedQuery::Web(request) => {
                check_limit(request.limit)?;
                check_confidence(request.min_confidence)?;
            }
            SavedQuery::Catalog(filter) => {
                check_limit(filter.limit)?;
            }
        }
        Ok(SavedSearch::new(name, query))
    }
}

/// POST /saved-searches
pub async fn create_saved_search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSavedSearchBody>,
) -> Result<(StatusCode, Json<SavedSearch>)> {
    let search = body.into_search()?;
    state.catalog.save_search(&search)?;
    tracing::info!("Saved search {} ({})", search.id(), search.name());
    Ok((StatusCode::CREATED, Json(search)))
}

/// GET /saved-searches
pub async fn list_saved_searches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SavedSearch>>> {
    Ok(Json(state.catalog.list_saved_searches()?))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReplayResults {
    Web(Vec<WebMcpResult>),
    Catalog(Vec<McpListItem>),
}

#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    pub id: String,
    pub name: String,
    pub results: ReplayResults,
}

/// POST /saved-searches/{id}/replay
pub async fn replay_saved_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReplayResponse>> {
    let search = state
        .catalog
        .get_saved_search(&id)?
        .ok_or_else(|| PlaygroundError::NotFound(format!("saved search {}", id)))?;

    let results = match search.query() {
        SavedQuery::Web(_) if !state.settings.scraping_enabled => {
            tracing::info!("Web discovery disabled, replaying {} as empty", id);
            ReplayResults::Web(Vec::new())
        }
        SavedQuery::Web(_) => {
            let records = search.replay(&state.discovery, &state.catalog).await?;
            ReplayResults::Web(records.into_iter().map(WebMcpResult::from).collect())
        }
        SavedQuery::Catalog(_) => {
            let records = search.replay(&state.discovery, &state.catalog).await?;
            ReplayResults::Catalog(records.into_iter().map(McpListItem::from).collect())
        }
    };

    Ok(Json(ReplayResponse {
        id: search.id().to_string(),
        name: search.name().to_string(),
        results,
    }))
}
