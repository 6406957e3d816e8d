//! Account API Handlers
//!
//! Deposits, minting/redeeming share pairs and position queries.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::models::{BalanceResponse, DepositRequest, MintRequest, PositionView};
use crate::utils::response::{validation_error, AppError};
use crate::AppState;

/// POST /api/deposit
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, AppError> {
    req.validate().map_err(validation_error)?;

    let balance = state.orchestrator.deposit(&req.user_id, req.amount);
    Ok(Json(BalanceResponse {
        user_id: req.user_id,
        balance,
    }))
}

/// POST /api/mint
pub async fn mint(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MintRequest>,
) -> Result<Json<PositionView>, AppError> {
    req.validate().map_err(validation_error)?;

    let position = state
        .orchestrator
        .mint(&req.user_id, req.market_id, req.amount)?;
    Ok(Json(position))
}

/// POST /api/redeem
pub async fn redeem(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MintRequest>,
) -> Result<Json<PositionView>, AppError> {
    req.validate().map_err(validation_error)?;

    let position = state
        .orchestrator
        .redeem(&req.user_id, req.market_id, req.amount)?;
    Ok(Json(position))
}

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub market_id: Uuid,
}

/// GET /api/position/:user?market_id=...
pub async fn get_position(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<PositionQuery>,
) -> Json<PositionView> {
    let position = state
        .orchestrator
        .ledger()
        .position(&user_id, query.market_id);
    Json(PositionView::new(user_id, query.market_id, position))
}

/// GET /api/balance/:user
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<BalanceResponse> {
    let balance = state.orchestrator.ledger().balance(&user_id);
    Json(BalanceResponse { user_id, balance })
}
