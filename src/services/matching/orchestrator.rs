//! Order Flow Orchestrator
//!
//! The single entry point for order intake. For a submitted order:
//! 1. Gate on the market lifecycle (only TRADING accepts orders).
//! 2. Admit against the ledger.
//! 3. Match in the (market, outcome) book.
//! 4. Apply each trade to the ledger and broadcast it.
//! 5. Broadcast the bi-outcome orderbook snapshot.
//! 6. Mirror the batch into the market's channel session, if one is bound.
//!
//! Each component lock is taken and released in turn; nothing here holds two
//! component locks at once. Channel transport failures are logged and retried
//! with the next batch; they never undo trades or reach the submitter.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::channel::{ChannelError, ChannelSession, SessionManager};
use crate::metrics::names;
use crate::models::{Market, MarketStatus, PositionView};
use crate::services::ledger::{Ledger, LedgerError};
use crate::services::market::{MarketError, MarketStore};
use crate::websocket::{BroadcastHub, ServerEvent};

use super::engine::BookRegistry;
use super::types::*;

#[derive(Debug, thiserror::Error)]
pub enum OrderFlowError {
    #[error("market not found: {0}")]
    MarketNotFound(Uuid),

    #[error("market {id} is not trading ({status})")]
    MarketNotTrading { id: Uuid, status: MarketStatus },

    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Market(#[from] MarketError),
}

/// Outcome of a resolution: the resolved market plus the payouts swept from
/// every open position.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResolveReport {
    pub market: Market,
    pub payouts: Vec<PayoutEntry>,
    pub total_paid: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PayoutEntry {
    pub user_id: String,
    pub amount: i64,
}

pub struct OrderFlowOrchestrator {
    markets: Arc<MarketStore>,
    ledger: Arc<Ledger>,
    books: Arc<BookRegistry>,
    hub: Arc<BroadcastHub>,
    sessions: Arc<SessionManager>,
    /// Market -> bound channel session (optional per market).
    market_sessions: DashMap<Uuid, Arc<ChannelSession>>,
}

impl OrderFlowOrchestrator {
    pub fn new(
        markets: Arc<MarketStore>,
        ledger: Arc<Ledger>,
        books: Arc<BookRegistry>,
        hub: Arc<BroadcastHub>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            markets,
            ledger,
            books,
            hub,
            sessions,
            market_sessions: DashMap::new(),
        }
    }

    pub fn markets(&self) -> &Arc<MarketStore> {
        &self.markets
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn books(&self) -> &Arc<BookRegistry> {
        &self.books
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Submit an order through the full §admission → matching → settlement
    /// pipeline. Returns the taker's final state and the trades executed.
    pub fn place_order(
        &self,
        user_id: String,
        market_id: Uuid,
        outcome: Outcome,
        side: Side,
        price: i64,
        quantity: i64,
    ) -> Result<PlaceResult, OrderFlowError> {
        let market = self
            .markets
            .get(market_id)
            .ok_or(OrderFlowError::MarketNotFound(market_id))?;
        if !market.is_trading() {
            return Err(OrderFlowError::MarketNotTrading {
                id: market_id,
                status: market.status,
            });
        }

        let order = Order::new(user_id, market_id, outcome, side, price, quantity);
        self.ledger.admit(&order)?;

        let book = self.books.get_or_create(market_id, outcome);
        let result = book.place(order)?;

        metrics::counter!(names::ORDERS_SUBMITTED_TOTAL).increment(1);
        for trade in &result.trades {
            self.ledger.apply(trade);
            self.hub.broadcast(&ServerEvent::Trade(trade.clone()));
            metrics::counter!(names::TRADES_EXECUTED_TOTAL).increment(1);
        }

        let depth = self.books.market_depth(market_id);
        self.hub.broadcast(&ServerEvent::Orderbook(depth));

        if !result.trades.is_empty() {
            self.sync_channel(market_id, result.trades.clone());
        }

        info!(
            order_id = %result.order.id,
            %market_id,
            status = %result.order.status,
            trades = result.trades.len(),
            "order processed"
        );
        Ok(result)
    }

    /// Cancel a resting order and push the updated book.
    pub fn cancel_order(
        &self,
        market_id: Uuid,
        outcome: Outcome,
        order_id: Uuid,
    ) -> Result<Order, OrderFlowError> {
        let book = self
            .books
            .get(market_id, outcome)
            .ok_or(MatchingError::OrderNotFound(order_id))?;
        let order = book.cancel(order_id)?;

        metrics::counter!(names::ORDERS_CANCELLED_TOTAL).increment(1);
        let depth = self.books.market_depth(market_id);
        self.hub.broadcast(&ServerEvent::Orderbook(depth));

        info!(order_id = %order_id, %market_id, "order cancelled");
        Ok(order)
    }

    pub fn deposit(&self, user_id: &str, amount: i64) -> i64 {
        self.ledger.deposit(user_id, amount);
        self.ledger.balance(user_id)
    }

    pub fn mint(
        &self,
        user_id: &str,
        market_id: Uuid,
        quantity: i64,
    ) -> Result<PositionView, OrderFlowError> {
        let market = self
            .markets
            .get(market_id)
            .ok_or(OrderFlowError::MarketNotFound(market_id))?;
        if market.status == MarketStatus::Resolved {
            return Err(OrderFlowError::MarketNotTrading {
                id: market_id,
                status: market.status,
            });
        }

        self.ledger.mint(user_id, market_id, quantity)?;
        metrics::counter!(names::MINT_OPERATIONS_TOTAL).increment(1);
        Ok(PositionView::new(
            user_id.to_string(),
            market_id,
            self.ledger.position(user_id, market_id),
        ))
    }

    pub fn redeem(
        &self,
        user_id: &str,
        market_id: Uuid,
        quantity: i64,
    ) -> Result<PositionView, OrderFlowError> {
        let market = self
            .markets
            .get(market_id)
            .ok_or(OrderFlowError::MarketNotFound(market_id))?;
        if market.status == MarketStatus::Resolved {
            return Err(OrderFlowError::MarketNotTrading {
                id: market_id,
                status: market.status,
            });
        }

        self.ledger.redeem(user_id, market_id, quantity)?;
        Ok(PositionView::new(
            user_id.to_string(),
            market_id,
            self.ledger.position(user_id, market_id),
        ))
    }

    /// Resolve a locked market and sweep payouts for every open position.
    pub fn resolve_market(
        &self,
        market_id: Uuid,
        outcome: Outcome,
    ) -> Result<ResolveReport, OrderFlowError> {
        let market = self.markets.resolve(market_id, outcome)?;

        let mut payouts = Vec::new();
        let mut total_paid = 0;
        for (user_id, _) in self.ledger.list_positions(market_id) {
            let amount = self.ledger.payout(&user_id, market_id, outcome);
            if amount > 0 {
                total_paid += amount;
                payouts.push(PayoutEntry { user_id, amount });
            }
        }

        info!(%market_id, %outcome, total_paid, holders = payouts.len(), "market resolved and paid out");
        Ok(ResolveReport {
            market,
            payouts,
            total_paid,
        })
    }

    /// Bind a channel session to a market so its trade batches are mirrored
    /// off-chain.
    pub fn bind_session(&self, market_id: Uuid, session: Arc<ChannelSession>) {
        self.market_sessions.insert(market_id, session);
    }

    pub fn unbind_session(&self, channel_id: &str) {
        self.market_sessions
            .retain(|_, session| session.channel_id() != channel_id);
    }

    /// Push a trade batch into the bound session off the request path. The
    /// ledger is authoritative; a channel failure only logs and the session
    /// re-converges on the next batch.
    fn sync_channel(&self, market_id: Uuid, trades: Vec<Trade>) {
        let Some(session) = self
            .market_sessions
            .get(&market_id)
            .map(|s| Arc::clone(&s))
        else {
            return;
        };

        let app_data = match serde_json::to_value(self.books.market_depth(market_id)) {
            Ok(app_data) => app_data,
            Err(e) => {
                warn!(%market_id, error = %e, "failed to encode channel app data");
                serde_json::Value::Null
            }
        };

        tokio::spawn(async move {
            match session.sync_trades(&trades, app_data).await {
                Ok(version) => {
                    tracing::debug!(
                        channel_id = %session.channel_id(),
                        version,
                        trades = trades.len(),
                        "channel state updated"
                    );
                }
                Err(ChannelError::SessionClosed(channel_id)) => {
                    warn!(%channel_id, "dropping trades for closed channel session");
                }
                Err(e) => {
                    warn!(
                        channel_id = %session.channel_id(),
                        error = %e,
                        "channel update failed, will retry on next trade"
                    );
                }
            }
        });
    }
}
