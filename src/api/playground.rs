use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::Result;
use crate::playground::{Protocol, RunReport};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CompareBody {
    pub prompt: String,
    /// Protocol names; empty runs every protocol.
    #[serde(default)]
    pub protocols: Vec<String>,
}

/// POST /playground/compare
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CompareBody>,
) -> Result<Json<Vec<RunReport>>> {
    let protocols = body
        .protocols
        .iter()
        .map(|p| p.parse::<Protocol>())
        .collect::<Result<Vec<_>>>()?;
    let reports = state.playground.compare(&body.prompt, &protocols).await?;
    tracing::debug!("Compared {} protocols", reports.len());
    Ok(Json(reports))
}
