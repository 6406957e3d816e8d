use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::channel::ChannelError;
use crate::services::ledger::LedgerError;
use crate::services::market::MarketError;
use crate::services::matching::{MatchingError, OrderFlowError};

/// Application error surfaced to REST callers as `{"error": string}` with
/// 400 for validation, 404 for missing resources and 500 for everything that
/// should not happen.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<OrderFlowError> for AppError {
    fn from(err: OrderFlowError) -> Self {
        match &err {
            OrderFlowError::MarketNotFound(_) => Self::not_found(err.to_string()),
            OrderFlowError::MarketNotTrading { .. } => Self::bad_request(err.to_string()),
            OrderFlowError::Matching(e) => Self::from_matching(e),
            OrderFlowError::Ledger(_) => Self::bad_request(err.to_string()),
            OrderFlowError::Market(e) => Self::from_market(e),
        }
    }
}

impl From<MarketError> for AppError {
    fn from(err: MarketError) -> Self {
        Self::from_market(&err)
    }
}

impl From<MatchingError> for AppError {
    fn from(err: MatchingError) -> Self {
        Self::from_matching(&err)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<ChannelError> for AppError {
    fn from(err: ChannelError) -> Self {
        match &err {
            ChannelError::SessionNotFound(_) => Self::not_found(err.to_string()),
            ChannelError::SessionClosed(_) | ChannelError::Allocation(_) => {
                Self::bad_request(err.to_string())
            }
            ChannelError::Signer(_) | ChannelError::Transport(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl AppError {
    fn from_market(err: &MarketError) -> Self {
        match err {
            MarketError::NotFound(_) => Self::not_found(err.to_string()),
            MarketError::InvalidTransition { .. } | MarketError::MarketNotLocked { .. } => {
                Self::bad_request(err.to_string())
            }
        }
    }

    fn from_matching(err: &MatchingError) -> Self {
        match err {
            MatchingError::OrderNotFound(_) => Self::not_found(err.to_string()),
            _ => Self::bad_request(err.to_string()),
        }
    }
}

/// Map `validator` failures onto the standard error body.
pub fn validation_error(err: validator::ValidationErrors) -> AppError {
    AppError::bad_request(err.to_string())
}
