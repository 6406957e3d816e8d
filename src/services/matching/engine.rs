//! Book Registry
//!
//! Lazy creation and lookup of order books per (market, outcome). Books are
//! never destroyed; a resolved market simply stops receiving orders.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::orderbook::OrderBook;
use super::types::{BookSnapshot, MarketDepth, Outcome};

pub struct BookRegistry {
    books: DashMap<(Uuid, Outcome), Arc<OrderBook>>,
}

impl BookRegistry {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
        }
    }

    /// Fetch the book for a (market, outcome), creating it on first use.
    /// Creation is atomic: concurrent callers observe the same book.
    pub fn get_or_create(&self, market_id: Uuid, outcome: Outcome) -> Arc<OrderBook> {
        self.books
            .entry((market_id, outcome))
            .or_insert_with(|| Arc::new(OrderBook::new(market_id, outcome)))
            .clone()
    }

    pub fn get(&self, market_id: Uuid, outcome: Outcome) -> Option<Arc<OrderBook>> {
        self.books.get(&(market_id, outcome)).map(|b| b.clone())
    }

    /// Snapshot one side of a market without instantiating an empty book.
    pub fn snapshot(&self, market_id: Uuid, outcome: Outcome) -> BookSnapshot {
        match self.get(market_id, outcome) {
            Some(book) => book.snapshot(),
            None => BookSnapshot {
                market_id,
                outcome,
                bids: Vec::new(),
                asks: Vec::new(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        }
    }

    /// Bi-outcome snapshot of a market, used for `orderbook` broadcasts and
    /// channel app-data.
    pub fn market_depth(&self, market_id: Uuid) -> MarketDepth {
        MarketDepth {
            market_id,
            yes: self.snapshot(market_id, Outcome::Yes),
            no: self.snapshot(market_id, Outcome::No),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }
}

impl Default for BookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_the_same_book() {
        let registry = BookRegistry::new();
        let market_id = Uuid::new_v4();

        let a = registry.get_or_create(market_id, Outcome::Yes);
        let b = registry.get_or_create(market_id, Outcome::Yes);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.book_count(), 1);

        let c = registry.get_or_create(market_id, Outcome::No);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.book_count(), 2);
    }

    #[test]
    fn snapshot_of_missing_book_is_empty() {
        let registry = BookRegistry::new();
        let snapshot = registry.snapshot(Uuid::new_v4(), Outcome::No);
        assert!(snapshot.bids.is_empty());
        assert!(snapshot.asks.is_empty());
        assert_eq!(registry.book_count(), 0);
    }
}
