//! Position Ledger
//!
//! Balances and per-(user, market) share holdings, with the pre-trade
//! admission checks. Every operation takes the single ledger lock, mutates,
//! and releases before returning; nothing here calls into other components.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::models::Position;
use crate::services::matching::{Order, Outcome, Side, Trade, PRICE_SCALE};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient balance: required {required} bp, available {available} bp")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("insufficient {outcome} shares: required {required}, available {available}")]
    InsufficientShares {
        outcome: Outcome,
        required: i64,
        available: i64,
    },
}

#[derive(Default)]
struct LedgerInner {
    /// user -> balance in basis points.
    balances: HashMap<String, i64>,
    /// (user, market) -> holdings.
    positions: HashMap<(String, Uuid), Position>,
}

pub struct Ledger {
    inner: Mutex<LedgerInner>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    /// Credit a user's quote balance.
    pub fn deposit(&self, user_id: &str, amount: i64) {
        let mut inner = self.inner.lock();
        *inner.balances.entry(user_id.to_string()).or_default() += amount;
        debug!(user_id, amount, "deposit credited");
    }

    pub fn balance(&self, user_id: &str) -> i64 {
        self.inner
            .lock()
            .balances
            .get(user_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn position(&self, user_id: &str, market_id: Uuid) -> Position {
        self.inner
            .lock()
            .positions
            .get(&(user_id.to_string(), market_id))
            .copied()
            .unwrap_or_default()
    }

    /// Mint `quantity` complementary YES/NO pairs against full collateral:
    /// each pair costs one quote unit.
    pub fn mint(&self, user_id: &str, market_id: Uuid, quantity: i64) -> Result<(), LedgerError> {
        let cost = quantity * PRICE_SCALE;
        let mut inner = self.inner.lock();

        let balance = inner.balances.entry(user_id.to_string()).or_default();
        if *balance < cost {
            return Err(LedgerError::InsufficientBalance {
                required: cost,
                available: *balance,
            });
        }
        *balance -= cost;

        let position = inner
            .positions
            .entry((user_id.to_string(), market_id))
            .or_default();
        position.yes_shares += quantity;
        position.no_shares += quantity;
        debug!(user_id, %market_id, quantity, "minted share pairs");
        Ok(())
    }

    /// Burn `quantity` YES/NO pairs back into quote balance.
    pub fn redeem(&self, user_id: &str, market_id: Uuid, quantity: i64) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock();
        let key = (user_id.to_string(), market_id);

        let position = inner.positions.entry(key).or_default();
        if position.yes_shares < quantity {
            return Err(LedgerError::InsufficientShares {
                outcome: Outcome::Yes,
                required: quantity,
                available: position.yes_shares,
            });
        }
        if position.no_shares < quantity {
            return Err(LedgerError::InsufficientShares {
                outcome: Outcome::No,
                required: quantity,
                available: position.no_shares,
            });
        }
        position.yes_shares -= quantity;
        position.no_shares -= quantity;

        *inner.balances.entry(user_id.to_string()).or_default() += quantity * PRICE_SCALE;
        debug!(user_id, %market_id, quantity, "redeemed share pairs");
        Ok(())
    }

    /// Pre-trade admission. Buyers must hold `price * quantity` basis points;
    /// sellers must hold the shares they are offering.
    pub fn admit(&self, order: &Order) -> Result<(), LedgerError> {
        let inner = self.inner.lock();
        match order.side {
            Side::Buy => {
                let required = order.price * order.quantity;
                let available = inner.balances.get(&order.user_id).copied().unwrap_or(0);
                if available < required {
                    return Err(LedgerError::InsufficientBalance {
                        required,
                        available,
                    });
                }
            }
            Side::Sell => {
                let available = inner
                    .positions
                    .get(&(order.user_id.clone(), order.market_id))
                    .map(|p| p.shares(order.outcome))
                    .unwrap_or(0);
                if available < order.quantity {
                    return Err(LedgerError::InsufficientShares {
                        outcome: order.outcome,
                        required: order.quantity,
                        available,
                    });
                }
            }
        }
        Ok(())
    }

    /// Settle one executed trade: move `price * quantity` basis points from
    /// buyer to seller and `quantity` shares of the traded outcome the other
    /// way.
    pub fn apply(&self, trade: &Trade) {
        let cost = trade.price * trade.quantity;
        let mut inner = self.inner.lock();

        *inner.balances.entry(trade.buyer.clone()).or_default() -= cost;
        *inner.balances.entry(trade.seller.clone()).or_default() += cost;

        *inner
            .positions
            .entry((trade.buyer.clone(), trade.market_id))
            .or_default()
            .shares_mut(trade.outcome) += trade.quantity;
        *inner
            .positions
            .entry((trade.seller.clone(), trade.market_id))
            .or_default()
            .shares_mut(trade.outcome) -= trade.quantity;

        debug!(
            trade_id = %trade.id,
            buyer = %trade.buyer,
            seller = %trade.seller,
            cost,
            "trade applied to ledger"
        );
    }

    /// Credit the winning shares at one quote unit apiece and zero the
    /// holdings. Idempotent: a second call finds empty holdings and credits
    /// nothing. Returns the amount credited in basis points.
    pub fn payout(&self, user_id: &str, market_id: Uuid, winning: Outcome) -> i64 {
        let mut inner = self.inner.lock();
        let key = (user_id.to_string(), market_id);

        let Some(position) = inner.positions.get_mut(&key) else {
            return 0;
        };
        let credited = position.shares(winning) * PRICE_SCALE;
        position.yes_shares = 0;
        position.no_shares = 0;

        if credited > 0 {
            *inner.balances.entry(user_id.to_string()).or_default() += credited;
        }
        credited
    }

    /// All non-empty positions in a market.
    pub fn list_positions(&self, market_id: Uuid) -> Vec<(String, Position)> {
        self.inner
            .lock()
            .positions
            .iter()
            .filter(|((_, m), p)| *m == market_id && !p.is_empty())
            .map(|((user, _), p)| (user.clone(), *p))
            .collect()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy(user: &str, market_id: Uuid, price: i64, quantity: i64) -> Order {
        Order::new(
            user.to_string(),
            market_id,
            Outcome::Yes,
            Side::Buy,
            price,
            quantity,
        )
    }

    fn sell(user: &str, market_id: Uuid, price: i64, quantity: i64) -> Order {
        Order::new(
            user.to_string(),
            market_id,
            Outcome::Yes,
            Side::Sell,
            price,
            quantity,
        )
    }

    #[test]
    fn mint_requires_full_collateral() {
        let ledger = Ledger::new();
        let market_id = Uuid::new_v4();
        ledger.deposit("alice", 999_999);

        let err = ledger.mint("alice", market_id, 100).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        ledger.deposit("alice", 1);
        ledger.mint("alice", market_id, 100).unwrap();
        assert_eq!(ledger.balance("alice"), 0);
        let position = ledger.position("alice", market_id);
        assert_eq!(position.yes_shares, 100);
        assert_eq!(position.no_shares, 100);
    }

    #[test]
    fn redeem_burns_pairs_and_refunds() {
        let ledger = Ledger::new();
        let market_id = Uuid::new_v4();
        ledger.deposit("alice", 1_000_000);
        ledger.mint("alice", market_id, 100).unwrap();

        ledger.redeem("alice", market_id, 40).unwrap();
        assert_eq!(ledger.balance("alice"), 400_000);
        let position = ledger.position("alice", market_id);
        assert_eq!(position.yes_shares, 60);
        assert_eq!(position.no_shares, 60);

        let err = ledger.redeem("alice", market_id, 61).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientShares { .. }));
    }

    #[test]
    fn admission_uses_price_times_quantity() {
        let ledger = Ledger::new();
        let market_id = Uuid::new_v4();
        ledger.deposit("bob", 600_000);

        // 7000 bp * 100 shares = 700_000 bp required.
        let err = ledger.admit(&buy("bob", market_id, 7_000, 100)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                required: 700_000,
                available: 600_000
            }
        ));

        assert!(ledger.admit(&buy("bob", market_id, 6_000, 100)).is_ok());
        // A zero-priced bid needs no balance at all.
        assert!(ledger.admit(&buy("nobody", market_id, 0, 100)).is_ok());
    }

    #[test]
    fn sell_admission_checks_outcome_shares() {
        let ledger = Ledger::new();
        let market_id = Uuid::new_v4();
        ledger.deposit("alice", 1_000_000);
        ledger.mint("alice", market_id, 50).unwrap();

        assert!(ledger.admit(&sell("alice", market_id, 5_000, 50)).is_ok());
        let err = ledger.admit(&sell("alice", market_id, 5_000, 51)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientShares { .. }));
    }

    #[test]
    fn apply_conserves_value_and_shares() {
        let ledger = Ledger::new();
        let market_id = Uuid::new_v4();
        ledger.deposit("alice", 1_000_000);
        ledger.deposit("bob", 1_000_000);
        ledger.mint("alice", market_id, 100).unwrap();

        let trade = Trade {
            id: Uuid::new_v4(),
            market_id,
            outcome: Outcome::Yes,
            buy_order_id: Uuid::new_v4(),
            sell_order_id: Uuid::new_v4(),
            buyer: "bob".to_string(),
            seller: "alice".to_string(),
            price: 6_000,
            quantity: 100,
            timestamp: 0,
        };
        ledger.apply(&trade);

        assert_eq!(ledger.balance("alice"), 600_000);
        assert_eq!(ledger.balance("bob"), 400_000);
        assert_eq!(ledger.position("alice", market_id).yes_shares, 0);
        assert_eq!(ledger.position("alice", market_id).no_shares, 100);
        assert_eq!(ledger.position("bob", market_id).yes_shares, 100);

        // YES and NO totals still balance across users.
        let positions = ledger.list_positions(market_id);
        let yes: i64 = positions.iter().map(|(_, p)| p.yes_shares).sum();
        let no: i64 = positions.iter().map(|(_, p)| p.no_shares).sum();
        assert_eq!(yes, no);
    }

    #[test]
    fn payout_is_idempotent() {
        let ledger = Ledger::new();
        let market_id = Uuid::new_v4();
        ledger.deposit("bob", 1_000_000);
        ledger.mint("bob", market_id, 100).unwrap();

        let credited = ledger.payout("bob", market_id, Outcome::Yes);
        assert_eq!(credited, 1_000_000);
        assert_eq!(ledger.position("bob", market_id), Position::default());

        // Second payout credits nothing.
        assert_eq!(ledger.payout("bob", market_id, Outcome::Yes), 0);
        assert_eq!(ledger.balance("bob"), 1_000_000);
    }

    /// Total deposited value is conserved across any sequence of mints,
    /// redemptions and trades: quote balances plus outstanding pair
    /// collateral always sum to the deposits.
    #[test]
    fn value_is_conserved_across_operation_sequences() {
        let ledger = Ledger::new();
        let market_a = Uuid::new_v4();
        let market_b = Uuid::new_v4();

        ledger.deposit("alice", 2_000_000);
        ledger.deposit("bob", 1_000_000);
        ledger.deposit("carol", 500_000);
        let deposited = 3_500_000;

        ledger.mint("alice", market_a, 120).unwrap();
        ledger.mint("alice", market_b, 30).unwrap();
        ledger.mint("bob", market_a, 50).unwrap();
        ledger.redeem("alice", market_b, 10).unwrap();

        for (buyer, seller, price, quantity) in [
            ("bob", "alice", 6_000, 40),
            ("carol", "alice", 5_500, 20),
            ("alice", "bob", 4_500, 15),
        ] {
            ledger.apply(&Trade {
                id: Uuid::new_v4(),
                market_id: market_a,
                outcome: Outcome::Yes,
                buy_order_id: Uuid::new_v4(),
                sell_order_id: Uuid::new_v4(),
                buyer: buyer.to_string(),
                seller: seller.to_string(),
                price,
                quantity,
                timestamp: 0,
            });
        }

        let balances: i64 = ["alice", "bob", "carol"]
            .iter()
            .map(|u| ledger.balance(u))
            .sum();
        let mut collateral = 0;
        for market_id in [market_a, market_b] {
            let positions = ledger.list_positions(market_id);
            let yes: i64 = positions.iter().map(|(_, p)| p.yes_shares).sum();
            let no: i64 = positions.iter().map(|(_, p)| p.no_shares).sum();
            assert_eq!(yes, no);
            collateral += yes * PRICE_SCALE;
        }

        assert_eq!(balances + collateral, deposited);
    }

    #[test]
    fn list_positions_skips_empty_holdings() {
        let ledger = Ledger::new();
        let market_id = Uuid::new_v4();
        ledger.deposit("alice", 1_000_000);
        ledger.mint("alice", market_id, 10).unwrap();
        ledger.redeem("alice", market_id, 10).unwrap();

        assert!(ledger.list_positions(market_id).is_empty());
    }
}
