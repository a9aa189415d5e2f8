pub mod api;
pub mod catalog;
pub mod discovery;
pub mod error;
pub mod facets;
pub mod notify;
pub mod playground;
pub mod record;
pub mod settings;

use std::sync::Arc;

use catalog::CatalogStore;
use discovery::fetch::{outbound_quota, HttpSchemaFetcher, RateLimitedClient, SchemaFetcher};
use discovery::scoring::ConfidenceScorer;
use discovery::Discovery;
use notify::EventBus;
use playground::Playground;
use settings::Settings;

/// Shared state behind every request handler.
pub struct AppState {
    pub catalog: CatalogStore,
    pub discovery: Discovery,
    pub fetcher: Arc<dyn SchemaFetcher>,
    pub events: EventBus,
    pub playground: Playground,
    pub settings: Settings,
}

/// Install ring as the process-wide rustls provider. Safe to call repeatedly.
pub fn ensure_tls_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mcp_playground_lib=info")),
        )
        .init();

    tracing::info!("Starting MCP playground v{}", env!("CARGO_PKG_VERSION"));
    ensure_tls_provider();

    let mut settings = Settings::load(&Settings::default_path());
    settings.apply_env_overrides();

    let catalog = CatalogStore::open(&settings.database_path())?;
    if settings.seed_samples {
        catalog.seed_samples()?;
    }

    let client = RateLimitedClient::new(
        settings.adapter_timeout(),
        outbound_quota(settings.outbound_requests_per_minute, settings.outbound_burst)?,
    )?;
    let fetcher: Arc<dyn SchemaFetcher> = Arc::new(HttpSchemaFetcher::new(client.clone()));
    let adapters = discovery::sources::build_adapters(&settings, &client, fetcher.clone());
    let discovery = Discovery::new(
        adapters,
        ConfidenceScorer::new(settings.scoring.clone()),
        settings.adapter_timeout(),
    );
    tracing::info!(
        "Web discovery {} ({} sources)",
        if settings.scraping_enabled { "enabled" } else { "disabled" },
        discovery.platforms().len()
    );

    let playground = Playground::from_mode(&settings.playground_mode)?;
    let addr = settings.bind_addr();

    let state = Arc::new(AppState {
        catalog,
        discovery,
        fetcher,
        events: EventBus::new(256),
        playground,
        settings,
    });

    api::start_server(state, &addr).await
}
