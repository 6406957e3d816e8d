//! Order Matching Module
//!
//! Price-time-priority matching for binary prediction markets.
//!
//! # Architecture
//!
//! ```text
//! API Handler
//!   ↓
//! OrderFlowOrchestrator
//!   ├→ MarketStore (lifecycle gate)
//!   ├→ Ledger (admission, trade application)
//!   ├→ BookRegistry (per market+outcome)
//!   │    └→ OrderBook (matching + bounded trade log)
//!   ├→ BroadcastHub (trade / orderbook events)
//!   └→ ChannelSession (off-chain state sync)
//! ```
//!
//! Every book is guarded by its own exclusive lock; the registry hands out
//! `Arc<OrderBook>` handles and creates books lazily. Sequence numbers are
//! allocated process-wide so the price-time tie-break is globally fair.

mod engine;
mod history;
mod orderbook;
mod orchestrator;
mod types;

pub use engine::BookRegistry;
pub use history::{TradeHistory, DEFAULT_TRADE_CAPACITY};
pub use orchestrator::{OrderFlowError, OrderFlowOrchestrator, PayoutEntry, ResolveReport};
pub use orderbook::OrderBook;
pub use types::*;
