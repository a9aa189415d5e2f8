//! HTTP API on axum.

pub mod events;
pub mod health;
pub mod mcps;
pub mod playground;
pub mod saved;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::error::PlaygroundError;
use crate::AppState;

pub const MAX_LIMIT: usize = 100;

impl IntoResponse for PlaygroundError {
    fn into_response(self) -> Response {
        let status = match &self {
            PlaygroundError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PlaygroundError::NotFound(_) => StatusCode::NOT_FOUND,
            PlaygroundError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Reject a `limit` outside 1..=100.
pub(crate) fn check_limit(limit: usize) -> crate::error::Result<usize> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(PlaygroundError::InvalidRequest(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, limit
        )))
    }
}

/// Reject a confidence threshold outside [0, 1].
pub(crate) fn check_confidence(min_confidence: f64) -> crate::error::Result<f64> {
    if (0.0..=1.0).contains(&min_confidence) {
        Ok(min_confidence)
    } else {
        Err(PlaygroundError::InvalidRequest(format!(
            "min_confidence must be between 0 and 1, got {}",
            min_confidence
        )))
    }
}

/// Split a comma-separated query parameter.
pub(crate) fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/mcps", get(mcps::list_mcps))
        .route("/mcps/search", get(mcps::search_mcps))
        .route("/mcps/search/enhanced", post(mcps::enhanced_search))
        .route("/mcps/import-from-web", post(mcps::import_from_web))
        .route("/mcps/tags", get(mcps::tag_cloud))
        .route("/mcps/recommendations", post(mcps::recommendations))
        .route("/mcps/{id}", get(mcps::get_mcp).delete(mcps::delete_mcp))
        .route("/mcps/{id}/use", post(mcps::use_mcp))
        .route(
            "/saved-searches",
            get(saved::list_saved_searches).post(saved::create_saved_search),
        )
        .route("/saved-searches/{id}/replay", post(saved::replay_saved_search))
        .route("/playground/compare", post(playground::compare))
        .route("/events", get(events::events))
        .layer(cors)
        .with_state(state)
}

/// Serve the API until ctrl-c.
pub async fn start_server(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    let router = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("MCP playground API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::catalog::CatalogStore;
    use crate::discovery::fetch::{FetchedDocument, SchemaFetcher};
    use crate::discovery::scoring::ConfidenceScorer;
    use crate::discovery::sources::SourceAdapter;
    use crate::discovery::Discovery;
    use crate::error::{PlaygroundError, Result};
    use crate::notify::EventBus;
    use crate::playground::Playground;
    use crate::record::{McpRecord, SourcePlatform};
    use crate::settings::Settings;
    use crate::AppState;

    pub struct FixedAdapter {
        pub platform: SourcePlatform,
        pub records: Vec<McpRecord>,
    }

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        fn platform(&self) -> SourcePlatform {
            self.platform
        }

        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<McpRecord>> {
            Ok(self.records.iter().take(limit).cloned().collect())
        }
    }

    /// Serves a weather schema for any github.com URL, fails otherwise.
    pub struct FakeFetcher;

    #[async_trait]
    impl SchemaFetcher for FakeFetcher {
        async fn fetch_schema(&self, source_url: &str) -> Result<FetchedDocument> {
            if source_url.contains("github.com") {
                Ok(FetchedDocument {
                    url: source_url.to_string(),
                    document: json!({
                        "name": "weather-mcp",
                        "description": "Weather forecasts",
                        "tools": [{ "name": "get_forecast", "description": "Daily forecast" }]
                    }),
                    file_type: "json",
                })
            } else {
                Err(PlaygroundError::Fetch(format!("{} is unreachable", source_url)))
            }
        }
    }

    pub fn weather_record(platform: SourcePlatform, url: &str) -> McpRecord {
        let mut record = McpRecord::discovered(url, platform, "weather-mcp", "Weather forecasts");
        record.domain = "weather".into();
        record.tags = vec!["weather".into(), "api".into()];
        record.schema = Some(json!({
            "name": "weather-mcp",
            "tools": [{ "name": "get_forecast" }]
        }));
        record.stars = Some(200);
        record
    }

    pub fn state_with(settings: Settings) -> Arc<AppState> {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(FixedAdapter {
                platform: SourcePlatform::Github,
                records: vec![weather_record(
                    SourcePlatform::Github,
                    "https://github.com/x/weather-mcp",
                )],
            }),
            Arc::new(FixedAdapter {
                platform: SourcePlatform::Web,
                records: vec![{
                    let mut r = McpRecord::discovered(
                        "https://example.com/finance.json",
                        SourcePlatform::Web,
                        "stocks",
                        "Stock quotes",
                    );
                    r.domain = "finance".into();
                    r
                }],
            }),
        ];
        let catalog = CatalogStore::open_in_memory().unwrap();
        catalog.seed_samples().unwrap();

        Arc::new(AppState {
            catalog,
            discovery: Discovery::new(
                adapters,
                ConfidenceScorer::default(),
                Duration::from_secs(1),
            ),
            fetcher: Arc::new(FakeFetcher),
            events: EventBus::new(16),
            playground: Playground::from_mode("simulated").unwrap(),
            settings,
        })
    }

    pub fn test_state() -> Arc<AppState> {
        state_with(Settings::default())
    }

    pub async fn send(
        state: Arc<AppState>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = super::router(state)
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}
