use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::services::matching::{Order, OrderStatus, Outcome, Side, Trade};

/// Body of `POST /api/order`.
///
/// Prices are integer basis points; 10 000 bp = 1 quote unit. Market orders
/// are expressed as limit orders at the extreme price (0 or 10 000).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub market_id: Uuid,
    pub outcome_id: Outcome,
    pub side: Side,
    #[validate(range(min = 0, max = 10000))]
    pub price: i64,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub filled: i64,
    pub remaining: i64,
    pub created_at: i64,
    pub trades: Vec<Trade>,
}

impl CreateOrderResponse {
    pub fn from_result(order: &Order, trades: Vec<Trade>) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            filled: order.filled,
            remaining: order.remaining(),
            created_at: order.created_at,
            trades,
        }
    }
}

/// Body of `POST /api/deposit`. Amounts are basis points.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DepositRequest {
    pub user_id: String,
    #[validate(range(min = 1))]
    pub amount: i64,
}

/// Body of `POST /api/mint` and `POST /api/redeem`. Amounts are share counts.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MintRequest {
    pub user_id: String,
    pub market_id: Uuid,
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
}
