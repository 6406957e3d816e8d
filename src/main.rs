use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod channel;
mod config;
mod metrics;
mod models;
mod services;
mod utils;
mod websocket;

use crate::auth::{JwtValidator, TokenValidator};
use crate::channel::{BrokerSigner, ChannelTransport, ClearinghouseClient, SessionManager, StateSigner};
use crate::config::AppConfig;
use crate::services::ledger::Ledger;
use crate::services::market::MarketStore;
use crate::services::matching::{BookRegistry, OrderFlowOrchestrator};
use crate::websocket::BroadcastHub;

pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Arc<OrderFlowOrchestrator>,
    pub hub: Arc<BroadcastHub>,
    pub token_validator: Arc<dyn TokenValidator>,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predmarket_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    tracing::info!("Starting predmarket backend v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Quote asset: {} (10 000 bp per unit), clearinghouse: {}",
        config.quote_asset,
        config.clearinghouse_url
    );

    let metrics_handle = metrics::init_metrics()?;

    // Core components
    let markets = Arc::new(MarketStore::new());
    let ledger = Arc::new(Ledger::new());
    let books = Arc::new(BookRegistry::new());
    let hub = Arc::new(BroadcastHub::new());

    // Channel subsystem
    let signer: Arc<dyn StateSigner> =
        Arc::new(BrokerSigner::from_hex_key(&config.broker_private_key)?);
    tracing::info!("Broker signer initialized ({})", signer.address());
    let transport: Arc<dyn ChannelTransport> =
        Arc::new(ClearinghouseClient::new(&config.clearinghouse_url)?);
    let sessions = Arc::new(SessionManager::new(
        transport,
        signer,
        config.adjudicator_address.clone(),
    ));

    let orchestrator = Arc::new(OrderFlowOrchestrator::new(
        Arc::clone(&markets),
        ledger,
        books,
        Arc::clone(&hub),
        sessions,
    ));

    // Auto-lock loop with cooperative shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let _auto_lock = Arc::clone(&markets).spawn_auto_lock(
        Duration::from_secs(config.auto_lock_interval_secs),
        shutdown_rx,
    );

    let token_validator: Arc<dyn TokenValidator> = Arc::new(JwtValidator::new(&config.jwt_secret));

    let state = Arc::new(AppState {
        config: config.clone(),
        orchestrator,
        hub,
        token_validator,
        metrics_handle,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .nest("/api", api::routes::create_router(state.clone()))
        .nest("/ws", websocket::routes::create_router(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
