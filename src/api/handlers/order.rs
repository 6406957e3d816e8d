//! Order API Handlers
//!
//! Order placement, cancellation, book snapshots and recent trades.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateOrderRequest, CreateOrderResponse};
use crate::services::matching::{BookSnapshot, Outcome, Trade};
use crate::utils::response::{validation_error, AppError};
use crate::AppState;

/// POST /api/order
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    req.validate().map_err(validation_error)?;

    let result = state.orchestrator.place_order(
        req.user_id,
        req.market_id,
        req.outcome_id,
        req.side,
        req.price,
        req.quantity,
    )?;
    Ok(Json(CreateOrderResponse::from_result(
        &result.order,
        result.trades,
    )))
}

#[derive(Debug, Deserialize)]
pub struct BookQuery {
    pub market_id: Uuid,
    pub outcome: Outcome,
}

/// GET /api/orderbook?market_id=...&outcome=YES|NO
pub async fn get_orderbook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookQuery>,
) -> Json<BookSnapshot> {
    Json(state.orchestrator.books().snapshot(query.market_id, query.outcome))
}

/// DELETE /api/order/:id?market_id=...&outcome=...
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Query(query): Query<BookQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let order = state
        .orchestrator
        .cancel_order(query.market_id, query.outcome, order_id)?;
    Ok(Json(serde_json::json!({
        "order_id": order.id,
        "status": order.status,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub market_id: Uuid,
    pub outcome: Outcome,
    pub limit: Option<usize>,
}

/// GET /api/trades?market_id=...&outcome=...
pub async fn get_trades(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TradesQuery>,
) -> Json<Vec<Trade>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let trades = state
        .orchestrator
        .books()
        .get(query.market_id, query.outcome)
        .map(|book| book.recent_trades(limit))
        .unwrap_or_default();
    Json(trades)
}
