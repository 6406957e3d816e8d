//! Orderbook Implementation
//!
//! One price-time-priority book per (market, outcome). A single exclusive lock
//! guards the whole book; matching, cancellation and snapshots all run under
//! it and release it before returning.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use uuid::Uuid;

use super::history::TradeHistory;
use super::types::*;

/// Priority key for one side of the book. Bids wrap the price in `Reverse` so
/// the first tree entry is always the top of book; the sequence number breaks
/// ties FIFO across all price levels.
type BidKey = (Reverse<i64>, u64);
type AskKey = (i64, u64);

struct BookInner {
    /// Highest price first, then lowest sequence.
    bids: BTreeMap<BidKey, Uuid>,
    /// Lowest price first, then lowest sequence.
    asks: BTreeMap<AskKey, Uuid>,
    /// Live orders by id. Cancelled and fully filled orders are removed here
    /// but may linger in the priority trees until matching sweeps past them.
    orders: HashMap<Uuid, Order>,
    trades: TradeHistory,
}

pub struct OrderBook {
    market_id: Uuid,
    outcome: Outcome,
    inner: Mutex<BookInner>,
}

impl OrderBook {
    pub fn new(market_id: Uuid, outcome: Outcome) -> Self {
        Self {
            market_id,
            outcome,
            inner: Mutex::new(BookInner {
                bids: BTreeMap::new(),
                asks: BTreeMap::new(),
                orders: HashMap::new(),
                trades: TradeHistory::default(),
            }),
        }
    }

    pub fn market_id(&self) -> Uuid {
        self.market_id
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Match an incoming order against the opposing side, then rest any
    /// remainder at its original price and sequence number.
    ///
    /// Execution price is always the resting order's price, so the taker only
    /// ever gets price improvement. Trades are returned (and logged) in
    /// execution order.
    pub fn place(&self, mut order: Order) -> Result<PlaceResult, MatchingError> {
        if order.price < 0 || order.price > PRICE_SCALE {
            return Err(MatchingError::InvalidPrice(order.price));
        }
        if order.quantity <= 0 {
            return Err(MatchingError::InvalidQuantity(order.quantity));
        }

        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let mut trades = Vec::new();
        let now = chrono::Utc::now().timestamp_millis();

        match order.side {
            Side::Buy => {
                while order.remaining() > 0 {
                    // Top of the ask side, sweeping stale entries lazily.
                    let (key, maker_id) = match inner.asks.iter().next() {
                        Some((&key, &id)) => (key, id),
                        None => break,
                    };
                    let maker = match inner.orders.get_mut(&maker_id) {
                        Some(maker) if maker.is_live() => maker,
                        _ => {
                            inner.asks.remove(&key);
                            continue;
                        }
                    };

                    if maker.price > order.price {
                        break;
                    }

                    let quantity = order.remaining().min(maker.remaining());
                    let price = maker.price;
                    order.fill(quantity);
                    maker.fill(quantity);

                    let trade = Trade {
                        id: Uuid::new_v4(),
                        market_id: self.market_id,
                        outcome: self.outcome,
                        buy_order_id: order.id,
                        sell_order_id: maker.id,
                        buyer: order.user_id.clone(),
                        seller: maker.user_id.clone(),
                        price,
                        quantity,
                        timestamp: now,
                    };

                    if maker.remaining() == 0 {
                        inner.orders.remove(&maker_id);
                        inner.asks.remove(&key);
                    }

                    inner.trades.push(trade.clone());
                    trades.push(trade);
                }

                if order.remaining() > 0 && order.status != OrderStatus::Cancelled {
                    inner
                        .bids
                        .insert((Reverse(order.price), order.sequence), order.id);
                    inner.orders.insert(order.id, order.clone());
                }
            }
            Side::Sell => {
                while order.remaining() > 0 {
                    let (key, maker_id) = match inner.bids.iter().next() {
                        Some((&key, &id)) => (key, id),
                        None => break,
                    };
                    let maker = match inner.orders.get_mut(&maker_id) {
                        Some(maker) if maker.is_live() => maker,
                        _ => {
                            inner.bids.remove(&key);
                            continue;
                        }
                    };

                    if maker.price < order.price {
                        break;
                    }

                    let quantity = order.remaining().min(maker.remaining());
                    let price = maker.price;
                    order.fill(quantity);
                    maker.fill(quantity);

                    let trade = Trade {
                        id: Uuid::new_v4(),
                        market_id: self.market_id,
                        outcome: self.outcome,
                        buy_order_id: maker.id,
                        sell_order_id: order.id,
                        buyer: maker.user_id.clone(),
                        seller: order.user_id.clone(),
                        price,
                        quantity,
                        timestamp: now,
                    };

                    if maker.remaining() == 0 {
                        inner.orders.remove(&maker_id);
                        inner.bids.remove(&key);
                    }

                    inner.trades.push(trade.clone());
                    trades.push(trade);
                }

                if order.remaining() > 0 && order.status != OrderStatus::Cancelled {
                    inner.asks.insert((order.price, order.sequence), order.id);
                    inner.orders.insert(order.id, order.clone());
                }
            }
        }

        Ok(PlaceResult { order, trades })
    }

    /// Mark an order cancelled and drop it from the by-id index. The priority
    /// tree entry stays behind and is swept on the next match that reaches it.
    pub fn cancel(&self, order_id: Uuid) -> Result<Order, MatchingError> {
        let mut inner = self.inner.lock();
        let mut order = inner
            .orders
            .remove(&order_id)
            .ok_or(MatchingError::OrderNotFound(order_id))?;
        order.status = OrderStatus::Cancelled;
        Ok(order)
    }

    /// Aggregate live orders into price levels: bids descending, asks
    /// ascending.
    pub fn snapshot(&self) -> BookSnapshot {
        let inner = self.inner.lock();

        let mut bids: Vec<BookLevel> = Vec::new();
        for (&(Reverse(price), _), id) in inner.bids.iter() {
            let Some(order) = inner.orders.get(id).filter(|o| o.is_live()) else {
                continue;
            };
            match bids.last_mut() {
                Some(level) if level.price == price => {
                    level.quantity += order.remaining();
                    level.order_count += 1;
                }
                _ => bids.push(BookLevel {
                    price,
                    quantity: order.remaining(),
                    order_count: 1,
                }),
            }
        }

        let mut asks: Vec<BookLevel> = Vec::new();
        for (&(price, _), id) in inner.asks.iter() {
            let Some(order) = inner.orders.get(id).filter(|o| o.is_live()) else {
                continue;
            };
            match asks.last_mut() {
                Some(level) if level.price == price => {
                    level.quantity += order.remaining();
                    level.order_count += 1;
                }
                _ => asks.push(BookLevel {
                    price,
                    quantity: order.remaining(),
                    order_count: 1,
                }),
            }
        }

        BookSnapshot {
            market_id: self.market_id,
            outcome: self.outcome,
            bids,
            asks,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// The last `n` trades, most recent first.
    pub fn recent_trades(&self, n: usize) -> Vec<Trade> {
        self.inner.lock().trades.recent(n)
    }

    pub fn best_bid(&self) -> Option<i64> {
        let inner = self.inner.lock();
        inner
            .bids
            .iter()
            .find(|(_, id)| inner.orders.get(id).map_or(false, |o| o.is_live()))
            .map(|(&(Reverse(price), _), _)| price)
    }

    pub fn best_ask(&self) -> Option<i64> {
        let inner = self.inner.lock();
        inner
            .asks
            .iter()
            .find(|(_, id)| inner.orders.get(id).map_or(false, |o| o.is_live()))
            .map(|(&(price, _), _)| price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> OrderBook {
        OrderBook::new(Uuid::new_v4(), Outcome::Yes)
    }

    fn order(book: &OrderBook, user: &str, side: Side, price: i64, quantity: i64) -> Order {
        Order::new(
            user.to_string(),
            book.market_id(),
            book.outcome(),
            side,
            price,
            quantity,
        )
    }

    #[test]
    fn rejects_invalid_price_and_quantity() {
        let book = book();
        let bad_price = order(&book, "alice", Side::Buy, 10_001, 10);
        assert!(matches!(
            book.place(bad_price),
            Err(MatchingError::InvalidPrice(10_001))
        ));

        let bad_quantity = order(&book, "alice", Side::Buy, 5_000, 0);
        assert!(matches!(
            book.place(bad_quantity),
            Err(MatchingError::InvalidQuantity(0))
        ));
    }

    #[test]
    fn full_cross_executes_at_resting_price() {
        let book = book();
        let ask = order(&book, "alice", Side::Sell, 6_000, 100);
        book.place(ask).unwrap();

        let bid = order(&book, "bob", Side::Buy, 7_000, 100);
        let result = book.place(bid).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.price, 6_000);
        assert_eq!(trade.quantity, 100);
        assert_eq!(trade.buyer, "bob");
        assert_eq!(trade.seller, "alice");
        assert_eq!(result.order.status, OrderStatus::Filled);

        // Both sides are gone from the book.
        let snapshot = book.snapshot();
        assert!(snapshot.bids.is_empty());
        assert!(snapshot.asks.is_empty());
    }

    #[test]
    fn partial_fill_sweeps_fifo_and_rests_remainder() {
        let book = book();
        let ask1 = order(&book, "maker1", Side::Sell, 5_000, 40);
        let ask1_id = ask1.id;
        book.place(ask1).unwrap();
        let ask2 = order(&book, "maker2", Side::Sell, 5_000, 40);
        let ask2_id = ask2.id;
        book.place(ask2).unwrap();

        let bid = order(&book, "taker", Side::Buy, 5_000, 100);
        let result = book.place(bid).unwrap();

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].sell_order_id, ask1_id);
        assert_eq!(result.trades[1].sell_order_id, ask2_id);
        assert_eq!(result.order.status, OrderStatus::Partial);
        assert_eq!(result.order.remaining(), 20);

        let snapshot = book.snapshot();
        assert_eq!(
            snapshot.bids,
            vec![BookLevel {
                price: 5_000,
                quantity: 20,
                order_count: 1
            }]
        );
        assert!(snapshot.asks.is_empty());
    }

    #[test]
    fn no_cross_leaves_spread() {
        let book = book();
        book.place(order(&book, "alice", Side::Buy, 4_000, 10)).unwrap();
        let result = book.place(order(&book, "bob", Side::Sell, 6_000, 10)).unwrap();
        assert!(result.trades.is_empty());

        let snapshot = book.snapshot();
        assert_eq!(
            snapshot.bids,
            vec![BookLevel {
                price: 4_000,
                quantity: 10,
                order_count: 1
            }]
        );
        assert_eq!(
            snapshot.asks,
            vec![BookLevel {
                price: 6_000,
                quantity: 10,
                order_count: 1
            }]
        );
        assert_eq!(book.best_ask().unwrap() - book.best_bid().unwrap(), 2_000);
    }

    #[test]
    fn cancelled_order_is_never_selected_as_top_of_book() {
        let book = book();
        let ask = order(&book, "alice", Side::Sell, 5_000, 10);
        let ask_id = ask.id;
        book.place(ask).unwrap();
        book.cancel(ask_id).unwrap();

        let result = book.place(order(&book, "bob", Side::Buy, 5_000, 10)).unwrap();
        assert!(result.trades.is_empty());
        // The bid rests; the cancelled ask was swept, not matched.
        assert_eq!(result.order.status, OrderStatus::Open);
        assert!(book.snapshot().asks.is_empty());
    }

    #[test]
    fn cancel_missing_order_fails() {
        let book = book();
        assert!(matches!(
            book.cancel(Uuid::new_v4()),
            Err(MatchingError::OrderNotFound(_))
        ));
    }

    #[test]
    fn price_zero_buy_only_matches_price_zero_ask() {
        let book = book();
        book.place(order(&book, "alice", Side::Sell, 1, 10)).unwrap();
        let result = book.place(order(&book, "bob", Side::Buy, 0, 10)).unwrap();
        assert!(result.trades.is_empty());

        book.place(order(&book, "carol", Side::Sell, 0, 5)).unwrap();
        let result = book.place(order(&book, "bob", Side::Buy, 0, 5)).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].price, 0);
    }

    #[test]
    fn better_price_beats_earlier_sequence() {
        let book = book();
        book.place(order(&book, "early", Side::Sell, 6_000, 10)).unwrap();
        book.place(order(&book, "late", Side::Sell, 5_500, 10)).unwrap();

        let result = book.place(order(&book, "taker", Side::Buy, 7_000, 10)).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].seller, "late");
        assert_eq!(result.trades[0].price, 5_500);
    }

    #[test]
    fn trade_log_records_in_order() {
        let book = book();
        book.place(order(&book, "alice", Side::Sell, 5_000, 10)).unwrap();
        book.place(order(&book, "bob", Side::Buy, 5_000, 4)).unwrap();
        book.place(order(&book, "carol", Side::Buy, 5_000, 6)).unwrap();

        let recent = book.recent_trades(10);
        assert_eq!(recent.len(), 2);
        // Most recent first.
        assert_eq!(recent[0].buyer, "carol");
        assert_eq!(recent[1].buyer, "bob");
    }
}
