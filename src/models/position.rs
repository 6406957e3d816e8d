use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::matching::Outcome;

/// Share holdings of one user in one market.
///
/// Both counts are non-negative; minting creates one share of each outcome,
/// trades move shares of a single outcome between users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub yes_shares: i64,
    pub no_shares: i64,
}

impl Position {
    pub fn shares(&self, outcome: Outcome) -> i64 {
        match outcome {
            Outcome::Yes => self.yes_shares,
            Outcome::No => self.no_shares,
        }
    }

    pub fn shares_mut(&mut self, outcome: Outcome) -> &mut i64 {
        match outcome {
            Outcome::Yes => &mut self.yes_shares,
            Outcome::No => &mut self.no_shares,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.yes_shares == 0 && self.no_shares == 0
    }
}

/// Position of a user in a market, as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionView {
    pub user_id: String,
    pub market_id: Uuid,
    pub yes_shares: i64,
    pub no_shares: i64,
}

impl PositionView {
    pub fn new(user_id: String, market_id: Uuid, position: Position) -> Self {
        Self {
            user_id,
            market_id,
            yes_shares: position.yes_shares,
            no_shares: position.no_shares,
        }
    }
}
