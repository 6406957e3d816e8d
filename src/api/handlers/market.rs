//! Market API Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::models::Market;
use crate::services::matching::{Outcome, ResolveReport};
use crate::utils::response::{validation_error, AppError};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMarketRequest {
    #[validate(length(min = 1, max = 500))]
    pub question: String,
    pub description: Option<String>,
    pub resolves_at: DateTime<Utc>,
    pub creator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveMarketRequest {
    pub outcome: Outcome,
}

/// POST /api/market
pub async fn create_market(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMarketRequest>,
) -> Result<Json<Market>, AppError> {
    req.validate().map_err(validation_error)?;

    let market = state.orchestrator.markets().create(
        req.question,
        req.description,
        req.resolves_at,
        req.creator_id,
    );
    metrics::gauge!(crate::metrics::names::ACTIVE_MARKETS)
        .set(state.orchestrator.markets().count() as f64);
    Ok(Json(market))
}

/// GET /api/markets
pub async fn list_markets(State(state): State<Arc<AppState>>) -> Json<Vec<Market>> {
    Json(state.orchestrator.markets().list())
}

/// GET /api/market/:id
pub async fn get_market(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Market>, AppError> {
    state
        .orchestrator
        .markets()
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("market not found: {id}")))
}

/// POST /api/market/:id/lock
pub async fn lock_market(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Market>, AppError> {
    Ok(Json(state.orchestrator.markets().lock(id)?))
}

/// POST /api/market/:id/resolve
pub async fn resolve_market(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveMarketRequest>,
) -> Result<Json<ResolveReport>, AppError> {
    Ok(Json(state.orchestrator.resolve_market(id, req.outcome)?))
}
