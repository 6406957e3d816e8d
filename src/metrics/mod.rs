//! Metrics Module
//!
//! Prometheus-compatible metrics for monitoring:
//! - Matching engine metrics (orders, trades, cancellations)
//! - Market metrics (active markets)
//! - Mint metrics
//! - WebSocket metrics (connections, messages)

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Metric names as constants for consistency
pub mod names {
    // Matching Engine Metrics
    pub const ORDERS_SUBMITTED_TOTAL: &str = "orders_submitted_total";
    pub const ORDERS_CANCELLED_TOTAL: &str = "orders_cancelled_total";
    pub const TRADES_EXECUTED_TOTAL: &str = "trades_executed_total";

    // Mint Metrics
    pub const MINT_OPERATIONS_TOTAL: &str = "mint_operations_total";

    // Market Metrics
    pub const ACTIVE_MARKETS: &str = "active_markets";

    // WebSocket Metrics
    pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
    pub const WS_MESSAGES_SENT_TOTAL: &str = "ws_messages_sent_total";
}

/// Initialize Prometheus metrics exporter
///
/// Returns a handle that can be used to render metrics at `/metrics`.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}
