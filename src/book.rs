// src/book.rs
//! Price-time-priority order book driven by decoded feed events.
//!
//! One [`OrderBook`] tracks a single instrument. Events are applied
//! mutatively in tape order; malformed references (unknown ids,
//! suspicious quantities) are logged and ignored so a bad message never
//! takes the replay down.
//!
//! ## Structure
//!
//! - **Sides**: one `BTreeMap<Price, PriceLevel>` per side; bids are
//!   iterated in reverse for best-first order.
//! - **Levels**: aggregate quantity, order count, and a FIFO of resting
//!   orders kept ascending by (ranking_time, ranking_seq).
//! - **Index**: order id → (side, price) handle for O(1) routing of
//!   executes and deletes; the in-level slot is recovered by id.
//!
//! ## Performance
//!
//! - Add: O(log P) level lookup + O(N) ranked FIFO insert
//! - Execute/Delete: O(1) index hit + O(log P) + O(N) FIFO scan
//! - Best-price queries: O(1) amortized (first live level per side)
//!
//! ## Example
//!
//! ```rust
//! use tickgap::book::OrderBook;
//! use tickgap::event::{Event, MessageKind, Side};
//!
//! let mut book = OrderBook::new();
//! book.apply(&Event {
//!     kind: MessageKind::AddOrder,
//!     order_id: 1,
//!     side: Side::Buy,
//!     price: 100,
//!     quantity: 1000,
//!     ..Event::default()
//! });
//!
//! assert_eq!(book.best_bid_price(), 100);
//! assert_eq!(book.best_bid_quantity(), 1000);
//! ```

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use tracing::warn;

use crate::event::{
    Event, MessageKind, OrderId, Price, Quantity, RankingSeq, RankingTime, Side,
    STATE_CONTINUOUS_TRADING,
};

/// Executed quantities above this are treated as feed corruption.
const MAX_SUSPICIOUS_QTY: Quantity = 1_000_000_000;

#[derive(Clone, Debug)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub ranking_time: RankingTime,
    pub ranking_seq: RankingSeq,
}

#[derive(Debug, Default)]
pub struct PriceLevel {
    pub price: Price,
    pub aggregate: Quantity,
    pub num_orders: u32,
    pub fifo: VecDeque<Order>,
}

/// Where an order lives; the slot inside the level is found by id so the
/// handle stays valid across FIFO mutation.
#[derive(Clone, Copy, Debug)]
struct OrderHandle {
    side: Side,
    price: Price,
}

/// One (price, aggregate quantity) pair of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LevelView {
    pub px: Price,
    pub qty: Quantity,
}

#[derive(Default)]
pub struct OrderBook {
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    index: hashbrown::HashMap<OrderId, OrderHandle>,
    trading_open: bool,
    last_exec_price: Price,
}

impl OrderBook {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one decoded event. Total over well-formed events;
    /// logs-and-ignores everything else.
    pub fn apply(&mut self, ev: &Event) {
        match ev.kind {
            MessageKind::StateChange => self.handle_state(ev),
            MessageKind::AddOrder => self.handle_add(ev),
            MessageKind::ExecuteOrder => self.handle_exec(ev),
            MessageKind::DeleteOrder => self.handle_delete(ev),
            MessageKind::Other => {}
        }
    }

    fn handle_state(&mut self, ev: &Event) {
        self.trading_open = ev.state == STATE_CONTINUOUS_TRADING;
    }

    fn handle_add(&mut self, ev: &Event) {
        if ev.quantity == 0 || ev.price == 0 {
            warn!(
                order_id = ev.order_id,
                qty = ev.quantity,
                px = ev.price,
                "add with zero quantity or price"
            );
        }

        // The feed should never reuse a live id. When it does, evict the
        // resting order first so aggregates and the index stay coherent.
        if self.index.contains_key(&ev.order_id) {
            warn!(order_id = ev.order_id, "add for an id already in the book, evicting old order");
            self.remove_order(ev.order_id);
        }

        let order = Order {
            id: ev.order_id,
            side: ev.side,
            price: ev.price,
            quantity: ev.quantity,
            ranking_time: ev.ranking_time,
            ranking_seq: ev.ranking_seq,
        };

        let level = self.level_for(ev.side, ev.price);

        // Ranked FIFO insert: before the first strictly-younger order,
        // at the end on ties (stable).
        let pos = level
            .fifo
            .iter()
            .position(|o| {
                order.ranking_time < o.ranking_time
                    || (order.ranking_time == o.ranking_time && order.ranking_seq < o.ranking_seq)
            })
            .unwrap_or(level.fifo.len());

        level.aggregate += order.quantity;
        level.num_orders += 1;
        level.fifo.insert(pos, order);

        self.index.insert(
            ev.order_id,
            OrderHandle {
                side: ev.side,
                price: ev.price,
            },
        );

        if self.crossed() {
            warn!(
                bid = self.best_bid_price(),
                ask = self.best_ask_price(),
                "book crossed after add"
            );
        }
    }

    fn handle_exec(&mut self, ev: &Event) {
        let Some(handle) = self.index.get(&ev.order_id).copied() else {
            warn!(order_id = ev.order_id, qty = ev.quantity, "execute for unknown order id");
            return;
        };

        if ev.quantity == 0 || ev.quantity > MAX_SUSPICIOUS_QTY {
            warn!(order_id = ev.order_id, qty = ev.quantity, "execute with suspicious quantity");
            return;
        }

        // This wire format carries no price on executes, so the resting
        // order's price is the usual source.
        self.last_exec_price = if ev.price != 0 { ev.price } else { handle.price };

        let Some(level) = side_map_mut(&mut self.bids, &mut self.asks, handle.side)
            .get_mut(&handle.price)
        else {
            warn!(order_id = ev.order_id, px = handle.price, "index points at a missing level");
            self.index.remove(&ev.order_id);
            return;
        };
        let Some(pos) = level.fifo.iter().position(|o| o.id == ev.order_id) else {
            warn!(order_id = ev.order_id, px = handle.price, "order missing from its level");
            self.index.remove(&ev.order_id);
            return;
        };

        let remaining = level.fifo[pos].quantity;

        if ev.quantity >= remaining {
            // Over-execution counts as full removal, not an error.
            self.remove_order(ev.order_id);
        } else {
            debug_assert!(
                level.aggregate >= ev.quantity,
                "level aggregate smaller than executed quantity"
            );
            level.fifo[pos].quantity = remaining - ev.quantity;
            level.aggregate = level.aggregate.saturating_sub(ev.quantity);
        }
    }

    fn handle_delete(&mut self, ev: &Event) {
        if self.index.contains_key(&ev.order_id) {
            self.remove_order(ev.order_id);
        } else {
            warn!(order_id = ev.order_id, "delete for unknown order id");
        }
    }

    /// Removes an order completely, fixing level aggregates and erasing
    /// the level if it empties. Returns the removed order's quantity.
    fn remove_order(&mut self, order_id: OrderId) -> Option<Quantity> {
        let handle = self.index.remove(&order_id)?;

        let map = side_map_mut(&mut self.bids, &mut self.asks, handle.side);
        let Some(level) = map.get_mut(&handle.price) else {
            warn!(order_id, px = handle.price, "index points at a missing level");
            return None;
        };
        let Some(pos) = level.fifo.iter().position(|o| o.id == order_id) else {
            warn!(order_id, px = handle.price, "order missing from its level");
            return None;
        };

        debug_assert!(level.num_orders > 0, "removing an order from an empty level");

        let order = level.fifo.remove(pos)?;

        debug_assert!(
            level.aggregate >= order.quantity,
            "level aggregate smaller than order quantity"
        );
        level.aggregate = level.aggregate.saturating_sub(order.quantity);
        level.num_orders = level.num_orders.saturating_sub(1);

        self.erase_level_if_empty(handle.side, handle.price);
        Some(order.quantity)
    }

    fn level_for(&mut self, side: Side, price: Price) -> &mut PriceLevel {
        let level = side_map_mut(&mut self.bids, &mut self.asks, side)
            .entry(price)
            .or_default();
        if level.price == 0 {
            level.price = price;
        }
        level
    }

    /// Empty levels are unreachable from queries and must not linger. A
    /// stale non-zero aggregate on an emptied level means the feed
    /// executed quantity that was never booked; coerce and keep going.
    fn erase_level_if_empty(&mut self, side: Side, price: Price) {
        let map = side_map_mut(&mut self.bids, &mut self.asks, side);
        if let Some(level) = map.get(&price) {
            if level.num_orders == 0 {
                if level.aggregate != 0 {
                    warn!(px = price, aggregate = level.aggregate, "emptied level held a stale aggregate, coercing to zero");
                }
                map.remove(&price);
            }
        }
    }

    #[inline]
    fn crossed(&self) -> bool {
        let b = self.best_bid_price();
        let a = self.best_ask_price();
        b != 0 && a != 0 && b >= a
    }
}

impl OrderBook {
    #[inline]
    pub fn trading_open(&self) -> bool {
        self.trading_open
    }

    /// True iff both sides have at least one level.
    #[inline]
    pub fn has_top(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    #[inline]
    pub fn last_exec_price(&self) -> Price {
        self.last_exec_price
    }

    /// Live orders across both sides.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Highest bid price with live quantity, or 0.
    pub fn best_bid_price(&self) -> Price {
        self.bids
            .iter()
            .rev()
            .find(|(_, l)| l.aggregate > 0)
            .map_or(0, |(&px, _)| px)
    }

    pub fn best_bid_quantity(&self) -> Quantity {
        self.bids
            .iter()
            .rev()
            .find(|(_, l)| l.aggregate > 0)
            .map_or(0, |(_, l)| l.aggregate)
    }

    /// Lowest ask price with live quantity, or 0.
    pub fn best_ask_price(&self) -> Price {
        self.asks
            .iter()
            .find(|(_, l)| l.aggregate > 0)
            .map_or(0, |(&px, _)| px)
    }

    pub fn best_ask_quantity(&self) -> Quantity {
        self.asks
            .iter()
            .find(|(_, l)| l.aggregate > 0)
            .map_or(0, |(_, l)| l.aggregate)
    }

    /// Up to `n` live levels per side, best-first.
    pub fn snapshot_n(&self, n: usize) -> (Vec<LevelView>, Vec<LevelView>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .filter(|(_, l)| l.aggregate > 0)
            .take(n)
            .map(|(&px, l)| LevelView { px, qty: l.aggregate })
            .collect();
        let asks = self
            .asks
            .iter()
            .filter(|(_, l)| l.aggregate > 0)
            .take(n)
            .map(|(&px, l)| LevelView { px, qty: l.aggregate })
            .collect();
        (bids, asks)
    }
}

#[inline]
fn side_map_mut<'a>(
    bids: &'a mut BTreeMap<Price, PriceLevel>,
    asks: &'a mut BTreeMap<Price, PriceLevel>,
    side: Side,
) -> &'a mut BTreeMap<Price, PriceLevel> {
    match side {
        Side::Buy => bids,
        _ => asks,
    }
}

impl OrderBook {
    /// Full structural audit, for tests.
    pub fn assert_invariants(&self) {
        let mut level_orders = 0usize;

        for (side, map) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            for (&px, level) in map.iter() {
                assert!(level.num_orders >= 1, "empty level survives at px={px}");
                assert_eq!(
                    level.num_orders as usize,
                    level.fifo.len(),
                    "num_orders mismatch at px={px}"
                );
                let sum: Quantity = level.fifo.iter().map(|o| o.quantity).sum();
                assert_eq!(level.aggregate, sum, "aggregate mismatch at px={px}");

                for pair in level.fifo.iter().zip(level.fifo.iter().skip(1)) {
                    let (a, b) = pair;
                    assert!(
                        (a.ranking_time, a.ranking_seq) <= (b.ranking_time, b.ranking_seq),
                        "fifo ranking order broken at px={px}"
                    );
                }

                for o in level.fifo.iter() {
                    assert_eq!(o.price, px, "order price disagrees with its level");
                    // Buy routes to bids; everything else (Sell and the
                    // tolerated Unknown) routes to asks.
                    assert_eq!(
                        o.side == Side::Buy,
                        side == Side::Buy,
                        "order side disagrees with its side map"
                    );
                    assert!(self.index.contains_key(&o.id), "live order missing from index");
                }

                level_orders += level.fifo.len();
            }
        }

        assert_eq!(self.index.len(), level_orders, "index size != live orders");

        for (&id, handle) in self.index.iter() {
            let map = match handle.side {
                Side::Buy => &self.bids,
                _ => &self.asks,
            };
            let level = map
                .get(&handle.price)
                .unwrap_or_else(|| panic!("index entry {id} points at a missing level"));
            assert!(
                level.fifo.iter().any(|o| o.id == id),
                "index entry {id} does not resolve to a live order"
            );
        }
    }
}
