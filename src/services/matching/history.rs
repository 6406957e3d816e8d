//! Bounded trade history, one ring per book.

use std::collections::VecDeque;

use super::types::Trade;

pub const DEFAULT_TRADE_CAPACITY: usize = 1000;

/// Append-only ring of recent trades; the oldest entries are dropped once
/// capacity is reached.
#[derive(Debug)]
pub struct TradeHistory {
    capacity: usize,
    trades: VecDeque<Trade>,
}

impl TradeHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            trades: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, trade: Trade) {
        if self.trades.len() == self.capacity {
            self.trades.pop_front();
        }
        self.trades.push_back(trade);
    }

    /// The last `n` trades, most recent first.
    pub fn recent(&self, n: usize) -> Vec<Trade> {
        self.trades.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

impl Default for TradeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_TRADE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::matching::Outcome;
    use uuid::Uuid;

    fn trade(price: i64) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            market_id: Uuid::new_v4(),
            outcome: Outcome::Yes,
            buy_order_id: Uuid::new_v4(),
            sell_order_id: Uuid::new_v4(),
            buyer: "b".to_string(),
            seller: "s".to_string(),
            price,
            quantity: 1,
            timestamp: 0,
        }
    }

    #[test]
    fn recent_returns_reverse_chronological() {
        let mut history = TradeHistory::new(10);
        history.push(trade(1));
        history.push(trade(2));
        history.push(trade(3));

        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].price, 3);
        assert_eq!(recent[1].price, 2);
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut history = TradeHistory::new(3);
        for price in 1..=5 {
            history.push(trade(price));
        }

        assert_eq!(history.len(), 3);
        let recent = history.recent(10);
        assert_eq!(
            recent.iter().map(|t| t.price).collect::<Vec<_>>(),
            vec![5, 4, 3]
        );
    }
}
