//! Matching Engine Types
//!
//! Shared types for the per-(market, outcome) order books.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use uuid::Uuid;

/// Basis points per quote unit. All prices and balances are integers in this
/// scale; a share pays out exactly `PRICE_SCALE` on the winning outcome.
pub const PRICE_SCALE: i64 = 10_000;

/// Process-wide order sequence counter. The sequence number is the tie-breaker
/// at equal price, so it must be global rather than per-book.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_sequence() -> u64 {
    NEXT_SEQUENCE.fetch_add(1, AtomicOrdering::Relaxed)
}

// ============================================================================
// Outcome / Side / Status
// ============================================================================

/// One leg of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = MatchingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "YES" => Ok(Outcome::Yes),
            "NO" => Ok(Outcome::No),
            other => Err(MatchingError::InvalidOutcome(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order status. `Cancelled` is terminal; `Filled` holds exactly when
/// `filled == quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Partial,
    Filled,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Partial => write!(f, "partial"),
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ============================================================================
// Order
// ============================================================================

/// A limit instruction resting in (or matching against) one book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub market_id: Uuid,
    pub outcome: Outcome,
    pub side: Side,
    /// Basis points, 0..=10_000.
    pub price: i64,
    pub quantity: i64,
    pub filled: i64,
    pub status: OrderStatus,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Process-wide monotonic tie-breaker, assigned at construction.
    pub sequence: u64,
}

impl Order {
    pub fn new(
        user_id: String,
        market_id: Uuid,
        outcome: Outcome,
        side: Side,
        price: i64,
        quantity: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            market_id,
            outcome,
            side,
            price,
            quantity,
            filled: 0,
            status: OrderStatus::Open,
            created_at: chrono::Utc::now().timestamp_millis(),
            sequence: next_sequence(),
        }
    }

    pub fn remaining(&self) -> i64 {
        self.quantity - self.filled
    }

    /// Apply a fill and advance the status accordingly.
    pub fn fill(&mut self, quantity: i64) {
        self.filled += quantity;
        self.status = if self.filled >= self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        };
    }

    pub fn is_live(&self) -> bool {
        self.status != OrderStatus::Cancelled && self.remaining() > 0
    }
}

// ============================================================================
// Trade
// ============================================================================

/// A match between one buy order and one sell order. The execution price is
/// always the resting order's price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub market_id: Uuid,
    pub outcome: Outcome,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer: String,
    pub seller: String,
    pub price: i64,
    pub quantity: i64,
    pub timestamp: i64,
}

// ============================================================================
// Snapshots
// ============================================================================

/// One aggregated price level of a book side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: i64,
    pub quantity: i64,
    pub order_count: u32,
}

/// Aggregated view of a single (market, outcome) book. Bids are sorted by
/// price descending, asks ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub market_id: Uuid,
    pub outcome: Outcome,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub timestamp: i64,
}

/// Bi-outcome snapshot of a market, as pushed over the broadcast hub after
/// every order event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDepth {
    pub market_id: Uuid,
    pub yes: BookSnapshot,
    pub no: BookSnapshot,
    pub timestamp: i64,
}

/// Result of placing an order: the taker's final state plus the trades it
/// produced, in execution order.
#[derive(Debug, Clone)]
pub struct PlaceResult {
    pub order: Order,
    pub trades: Vec<Trade>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("invalid price: {0} (expected 0..={PRICE_SCALE} basis points)")]
    InvalidPrice(i64),

    #[error("invalid quantity: {0} (expected a positive share count)")]
    InvalidQuantity(i64),

    #[error("invalid outcome: {0} (expected YES or NO)")]
    InvalidOutcome(String),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),
}
