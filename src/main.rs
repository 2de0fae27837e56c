use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use isp_chat_intake::config::Config;
use isp_chat_intake::dispatcher::Dispatcher;
use isp_chat_intake::handlers::{self, AppState};
use isp_chat_intake::registry_client::RegistryClient;
use isp_chat_intake::webhook_handler;

/// Webhook server: receives chat messages, answers with the bot's replies.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "isp_chat_intake=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let registry = RegistryClient::new(
        config.registry_base_url.clone(),
        config.registry_api_key.clone(),
        config.registry_timeout,
    )?;
    tracing::info!("✓ Registry client initialized: {}", config.registry_base_url);

    let dispatcher = Arc::new(Dispatcher::new(config.bot.clone(), Arc::new(registry)));
    let app_state = Arc::new(AppState::new(config.clone(), dispatcher));
    tracing::info!("Message deduplication cache initialized");

    // 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = Router::new()
        .route("/api/v1/webhooks/chat", post(webhook_handler::chat_webhook))
        .layer(
            ServiceBuilder::new()
                // 1MB is far above any chat batch
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
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
