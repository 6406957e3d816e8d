//! Per-channel allocation state.
//!
//! A participant -> amount map with a strictly monotonic version counter. The
//! total is fixed when the channel opens; every mutation moves value between
//! participants and can never create or destroy it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::services::matching::PRICE_SCALE;

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("insufficient allocation for {participant}: required {required}, available {available}")]
    InsufficientFunds {
        participant: String,
        required: i64,
        available: i64,
    },
}

/// Wire form of an allocation: amounts as decimal strings, participants in
/// deterministic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    pub version: u64,
    pub balances: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ChannelAllocation {
    version: u64,
    balances: HashMap<String, i64>,
    total: i64,
}

impl ChannelAllocation {
    /// Seed the channel at version 0. The initial amounts fix the conserved
    /// total for the lifetime of the channel.
    pub fn new(initial: HashMap<String, i64>) -> Self {
        let total = initial.values().sum();
        Self {
            version: 0,
            balances: initial,
            total,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn balance(&self, participant: &str) -> Option<i64> {
        self.balances.get(participant).copied()
    }

    pub fn contains(&self, participant: &str) -> bool {
        self.balances.contains_key(participant)
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Move `amount` from one participant to another and bump the version.
    pub fn transfer(&mut self, from: &str, to: &str, amount: i64) -> Result<(), AllocationError> {
        if !self.balances.contains_key(to) {
            return Err(AllocationError::UnknownParticipant(to.to_string()));
        }
        let available = self
            .balances
            .get(from)
            .copied()
            .ok_or_else(|| AllocationError::UnknownParticipant(from.to_string()))?;
        if available < amount {
            return Err(AllocationError::InsufficientFunds {
                participant: from.to_string(),
                required: amount,
                available,
            });
        }

        if let Some(balance) = self.balances.get_mut(from) {
            *balance -= amount;
        }
        if let Some(balance) = self.balances.get_mut(to) {
            *balance += amount;
        }
        self.version += 1;
        Ok(())
    }

    /// Mirror one matched trade into the channel: the buyer pays the seller
    /// `price * quantity` scaled into the channel's declared unit.
    pub fn apply_trade(
        &mut self,
        buyer: &str,
        seller: &str,
        price: i64,
        quantity: i64,
    ) -> Result<(), AllocationError> {
        let cost = price * quantity / PRICE_SCALE;
        self.transfer(buyer, seller, cost)
    }

    pub fn snapshot(&self) -> AllocationSnapshot {
        AllocationSnapshot {
            version: self.version,
            balances: self
                .balances
                .iter()
                .map(|(participant, amount)| (participant.clone(), amount.to_string()))
                .collect(),
        }
    }
}
