use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::services::matching::Outcome;

/// Lifecycle status of a market.
///
/// Transitions are one-way: `Trading` -> `Locked` -> `Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Trading,
    Locked,
    Resolved,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStatus::Trading => write!(f, "trading"),
            MarketStatus::Locked => write!(f, "locked"),
            MarketStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A binary prediction market.
///
/// `outcome` is `Some` exactly when `status == Resolved`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: Uuid,
    pub question: String,
    pub description: Option<String>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub resolves_at: DateTime<Utc>,
    pub status: MarketStatus,
    pub outcome: Option<Outcome>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Market {
    pub fn new(
        question: String,
        description: Option<String>,
        resolves_at: DateTime<Utc>,
        creator: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            description,
            creator,
            created_at: Utc::now(),
            resolves_at,
            status: MarketStatus::Trading,
            outcome: None,
            resolved_at: None,
        }
    }

    pub fn is_trading(&self) -> bool {
        self.status == MarketStatus::Trading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_market_is_trading_without_outcome() {
        let market = Market::new(
            "Will it rain tomorrow?".to_string(),
            None,
            Utc::now(),
            "creator-1".to_string(),
        );

        assert_eq!(market.status, MarketStatus::Trading);
        assert!(market.outcome.is_none());
        assert!(market.resolved_at.is_none());
    }
}
