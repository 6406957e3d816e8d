//! Channel Session API Handlers
//!
//! Opening, closing and settling clearinghouse channels.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::channel::adjudicate;
use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub participants: Vec<String>,
    /// Participant -> amount in the channel's declared unit.
    pub allocations: HashMap<String, i64>,
    /// Bind the session to a market so its trades are mirrored off-chain.
    pub market_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub channel_id: String,
    #[serde(rename = "type")]
    pub settle_type: SettleType,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleType {
    Cooperative,
    Dispute,
}

/// POST /api/session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.participants.is_empty() {
        return Err(AppError::bad_request("participants must not be empty"));
    }
    for participant in &req.participants {
        if !req.allocations.contains_key(participant) {
            return Err(AppError::bad_request(format!(
                "missing allocation for participant {participant}"
            )));
        }
    }

    if let Some(market_id) = req.market_id {
        if state.orchestrator.markets().get(market_id).is_none() {
            return Err(AppError::not_found(format!("market not found: {market_id}")));
        }
    }

    let session = state
        .orchestrator
        .sessions()
        .create(req.participants, req.allocations)
        .await?;

    if let Some(market_id) = req.market_id {
        state
            .orchestrator
            .bind_session(market_id, Arc::clone(&session));
    }

    Ok(Json(json!({
        "channel_id": session.channel_id(),
        "participants": session.participants(),
        "asset": state.config.quote_asset,
        "version": session.version().await,
    })))
}

/// DELETE /api/session/:id
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.orchestrator.sessions().close(&channel_id).await?;
    state.orchestrator.unbind_session(&channel_id);
    Ok(Json(json!({ "channel_id": channel_id, "active": false })))
}

/// POST /api/settle
pub async fn settle(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let sessions = state.orchestrator.sessions();
    let session = sessions
        .get(&req.channel_id)
        .ok_or_else(|| AppError::not_found(format!("session not found: {}", req.channel_id)))?;

    match req.settle_type {
        SettleType::Cooperative => {
            sessions.close(&req.channel_id).await?;
            state.orchestrator.unbind_session(&req.channel_id);
            Ok(Json(json!({
                "channel_id": req.channel_id,
                "settled": true,
                "mode": "cooperative",
            })))
        }
        SettleType::Dispute => {
            let Some((candidate, proofs)) = session.dispute_material().await else {
                return Err(AppError::bad_request(
                    "no transmitted states to adjudicate",
                ));
            };
            let admissible = adjudicate(&session.config(), &candidate, &proofs);
            if admissible {
                sessions.close(&req.channel_id).await?;
                state.orchestrator.unbind_session(&req.channel_id);
            }
            Ok(Json(json!({
                "channel_id": req.channel_id,
                "settled": admissible,
                "mode": "dispute",
                "candidate_version": candidate.version,
            })))
        }
    }
}
