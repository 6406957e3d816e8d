//! Market Lifecycle Service
//!
//! Owns all market records and their one-way state machine:
//! trading -> locked -> resolved. A background loop locks markets whose
//! `resolves_at` has passed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Market, MarketStatus};
use crate::services::matching::Outcome;

#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("market not found: {0}")]
    NotFound(Uuid),

    #[error("invalid transition: market {id} is {status}")]
    InvalidTransition { id: Uuid, status: MarketStatus },

    #[error("market not locked: {id} is {status}")]
    MarketNotLocked { id: Uuid, status: MarketStatus },
}

pub struct MarketStore {
    markets: RwLock<HashMap<Uuid, Market>>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self {
            markets: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(
        &self,
        question: String,
        description: Option<String>,
        resolves_at: DateTime<Utc>,
        creator: String,
    ) -> Market {
        let market = Market::new(question, description, resolves_at, creator);
        self.markets.write().insert(market.id, market.clone());
        info!(market_id = %market.id, question = %market.question, "market created");
        market
    }

    pub fn get(&self, id: Uuid) -> Option<Market> {
        self.markets.read().get(&id).cloned()
    }

    /// All markets, newest first.
    pub fn list(&self) -> Vec<Market> {
        let mut markets: Vec<Market> = self.markets.read().values().cloned().collect();
        markets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        markets
    }

    pub fn count(&self) -> usize {
        self.markets.read().len()
    }

    /// trading -> locked.
    pub fn lock(&self, id: Uuid) -> Result<Market, MarketError> {
        let mut markets = self.markets.write();
        let market = markets.get_mut(&id).ok_or(MarketError::NotFound(id))?;
        if market.status != MarketStatus::Trading {
            return Err(MarketError::InvalidTransition {
                id,
                status: market.status,
            });
        }
        market.status = MarketStatus::Locked;
        info!(market_id = %id, "market locked");
        Ok(market.clone())
    }

    /// locked -> resolved. Sets the outcome and resolution timestamp; a
    /// resolved market is immutable.
    pub fn resolve(&self, id: Uuid, outcome: Outcome) -> Result<Market, MarketError> {
        let mut markets = self.markets.write();
        let market = markets.get_mut(&id).ok_or(MarketError::NotFound(id))?;
        if market.status != MarketStatus::Locked {
            return Err(MarketError::MarketNotLocked {
                id,
                status: market.status,
            });
        }
        market.status = MarketStatus::Resolved;
        market.outcome = Some(outcome);
        market.resolved_at = Some(Utc::now());
        info!(market_id = %id, %outcome, "market resolved");
        Ok(market.clone())
    }

    /// Lock every trading market whose `resolves_at` is in the past. Failures
    /// are logged and retried on the next tick.
    pub fn lock_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<Uuid> = self
            .markets
            .read()
            .values()
            .filter(|m| m.status == MarketStatus::Trading && m.resolves_at <= now)
            .map(|m| m.id)
            .collect();

        let mut locked = 0;
        for id in expired {
            match self.lock(id) {
                Ok(_) => locked += 1,
                Err(e) => warn!(market_id = %id, error = %e, "auto-lock failed, will retry"),
            }
        }
        locked
    }

    /// Spawn the auto-lock loop. Wakes at a fixed cadence and observes the
    /// shutdown signal at each wake point.
    pub fn spawn_auto_lock(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let store = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            info!(interval_secs = interval.as_secs(), "auto-lock loop started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let locked = store.lock_expired();
                        if locked > 0 {
                            info!(locked, "auto-locked expired markets");
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("auto-lock loop stopping");
                        break;
                    }
                }
            }
        })
    }
}

impl Default for MarketStore {
    fn default() -> Self {
        Self::new()
    }
}
