use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::AppState;

pub fn create_router(_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Markets
        .route("/market", post(handlers::market::create_market))
        .route("/markets", get(handlers::market::list_markets))
        .route("/market/:id", get(handlers::market::get_market))
        .route("/market/:id/lock", post(handlers::market::lock_market))
        .route("/market/:id/resolve", post(handlers::market::resolve_market))
        // Accounts
        .route("/deposit", post(handlers::account::deposit))
        .route("/mint", post(handlers::account::mint))
        .route("/redeem", post(handlers::account::redeem))
        .route("/position/:user", get(handlers::account::get_position))
        .route("/balance/:user", get(handlers::account::get_balance))
        // Orders
        .route("/order", post(handlers::order::create_order))
        .route("/order/:id", delete(handlers::order::cancel_order))
        .route("/orderbook", get(handlers::order::get_orderbook))
        .route("/trades", get(handlers::order::get_trades))
        // Channel sessions
        .route("/session", post(handlers::session::create_session))
        .route("/session/:id", delete(handlers::session::close_session))
        .route("/settle", post(handlers::session::settle))
}
