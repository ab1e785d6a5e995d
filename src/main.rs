use axum::{
    routing::{get, post},
    Router,
};
use rust_lead_hunter::batch::BatchOrchestrator;
use rust_lead_hunter::config::Config;
use rust_lead_hunter::handlers::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, wires the source adapters into
/// the lead pipeline and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_hunter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "Configuration loaded (paid search: {}, recency cutoff: {}, concurrency: {})",
        config.has_serpapi_key(),
        config.recency_cutoff,
        config.enrichment_concurrency
    );

    let pipeline = Arc::new(BatchOrchestrator::from_config(&config)?);
    tracing::info!("✓ Lead pipeline initialized");

    let app_state = Arc::new(AppState {
        pipeline,
        config: config.clone(),
    });

    // Rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = Router::new()
        .route("/api/v1/discover", post(handlers::discover))
        .route("/api/v1/leads/process", post(handlers::process_leads))
        .route("/api/v1/leads/upload", post(handlers::upload_csv))
        .route("/api/v1/leads/export", post(handlers::export_csv))
        .layer(
            ServiceBuilder::new()
                // 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
