use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::record::SourcePlatform;
use crate::AppState;

const FEATURES: &[&str] = &[
    "web_discovery",
    "mcp_validation",
    "confidence_scoring",
    "catalog_import",
    "tag_cloud",
    "recommendations",
    "saved_searches",
    "protocol_comparison",
];

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub features: &'static [&'static str],
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "MCP playground API",
        version: env!("CARGO_PKG_VERSION"),
        features: FEATURES,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub database: &'static str,
    pub scraping_enabled: bool,
    /// Platforms a search can actually reach right now.
    pub supported_platforms: Vec<SourcePlatform>,
    pub version: &'static str,
    pub features: &'static [&'static str],
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connected = state.catalog.ping();
    let scraping_enabled = state.settings.scraping_enabled;
    let configured = state.discovery.platforms();
    let supported_platforms = if scraping_enabled {
        state
            .settings
            .enabled_platforms()
            .into_iter()
            .filter(|p| configured.contains(p))
            .collect()
    } else {
        Vec::new()
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: if connected { "connected" } else { "disconnected" },
        scraping_enabled,
        supported_platforms,
        version: env!("CARGO_PKG_VERSION"),
        features: FEATURES,
    })
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, state_with, test_state};
    use crate::record::SourcePlatform;
    use crate::settings::Settings;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_health_reports_reachable_platforms() {
        let (status, body) = send(test_state(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
        assert_eq!(body["scraping_enabled"], true);
        // only github and web have adapters in the test state
        assert_eq!(body["supported_platforms"], json!(["github", "web"]));
    }

    #[tokio::test]
    async fn test_health_with_scraping_disabled() {
        let state = state_with(Settings {
            scraping_enabled: false,
            enabled_sources: vec![SourcePlatform::Github],
            ..Settings::default()
        });
        let (_, body) = send(state, Method::GET, "/health", None).await;
        assert_eq!(body["scraping_enabled"], false);
        assert_eq!(body["supported_platforms"], json!([]));
    }

    #[tokio::test]
    async fn test_root_banner() {
        let (status, body) = send(test_state(), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["features"].as_array().unwrap().len() > 3);
    }
}
