// src/strategy.rs
//! Spread-gap strategy: a state machine over per-batch top-of-book
//! snapshots.
//!
//! A trade fires when the previous batch closed with a tight spread
//! (one tick) and the current batch closes with a gap (two ticks), with
//! exactly one side having moved by exactly one tick. The vanished
//! level is chased with a simulated marketable order at its old price,
//! capped by position limits. End of day, the open position is marked
//! at the last executed price.
//!
//! Decisions come back as typed [`Action`]s; rendering belongs to the
//! caller.

use tracing::{debug, error};

use crate::book::OrderBook;
use crate::event::{Event, InstrumentId, Nanos, Price, Quantity, Side};

pub const DEFAULT_PRICE_TICK: Price = 10;

#[derive(Clone, Copy, Debug)]
pub struct StrategyParams {
    pub instrument: InstrumentId,
    pub order_qty: Quantity,
    pub max_pos: i64,
    pub min_pos: i64,
    /// Smallest price increment, in kuruş. Tight spread is one tick,
    /// gap spread two.
    pub tick: Price,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            instrument: 0,
            order_qty: 100,
            max_pos: 1000,
            min_pos: 0,
            tick: DEFAULT_PRICE_TICK,
        }
    }
}

/// A simulated fill, with the post-fill strategy state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fill {
    pub side: Side,
    pub qty: Quantity,
    pub price: Price,
    pub position: i64,
    pub realized_pnl: i64,
}

/// End-of-day settlement outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub last_exec_price: Price,
    pub position: i64,
    pub realized_pnl: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Trade(Fill),
    Settled(Settlement),
}

pub struct Strategy {
    params: StrategyParams,
    position: i64,
    realized_pnl: i64,
    prev_bid: Price,
    prev_ask: Price,
    have_prev: bool,
    day_closed: bool,
}

impl Strategy {
    pub fn new(params: StrategyParams) -> Self {
        if params.instrument == 0 {
            error!("strategy configured with instrument 0");
        }
        if params.order_qty == 0 {
            error!("strategy configured with zero order quantity");
        }
        if params.max_pos <= params.min_pos {
            error!(
                max_pos = params.max_pos,
                min_pos = params.min_pos,
                "strategy position limits inverted"
            );
        }

        Self {
            params,
            position: 0,
            realized_pnl: 0,
            prev_bid: 0,
            prev_ask: 0,
            have_prev: false,
            day_closed: false,
        }
    }

    #[inline]
    pub fn instrument(&self) -> InstrumentId {
        self.params.instrument
    }

    /// Net position; positive is long.
    #[inline]
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Cumulative realized P&L in kuruş.
    #[inline]
    pub fn realized_pnl(&self) -> i64 {
        self.realized_pnl
    }

    #[inline]
    pub fn day_closed(&self) -> bool {
        self.day_closed
    }

    /// Runs the detector against one completed nanosecond batch. The
    /// book must already contain every event of the batch.
    pub fn on_batch(&mut self, ns: Nanos, book: &OrderBook, batch: &[Event]) -> Option<Action> {
        if self.day_closed {
            debug!(ns, "skip: day closed");
            return None;
        }
        if batch.is_empty() {
            debug!(ns, "skip: empty batch");
            return None;
        }

        // Market close anywhere in the batch is a hard stop; prev_* is
        // deliberately left untouched.
        if batch.iter().any(|e| e.is_close_sentinel()) {
            debug!(ns, "market close detected, settling");
            return self.end_of_day(book).map(Action::Settled);
        }

        let curr_bid = book.best_bid_price();
        let curr_ask = book.best_ask_price();

        // Without an open market, a top, and a previous snapshot there
        // is no transition to judge; just record what we see.
        if !book.trading_open() || !book.has_top() || !self.have_prev {
            debug!(ns, "no transition to judge, recording snapshot");
            self.prev_bid = curr_bid;
            self.prev_ask = curr_ask;
            self.have_prev = true;
            return None;
        }

        let action = self.detect(ns, curr_bid, curr_ask);

        self.prev_bid = curr_bid;
        self.prev_ask = curr_ask;
        self.have_prev = true;

        action
    }

    fn detect(&mut self, ns: Nanos, curr_bid: Price, curr_ask: Price) -> Option<Action> {
        let tick = i64::from(self.params.tick);
        let tight = tick;
        let gap = 2 * tick;

        let prev_spread = i64::from(self.prev_ask) - i64::from(self.prev_bid);
        let curr_spread = i64::from(curr_ask) - i64::from(curr_bid);

        if !(prev_spread == tight && curr_spread == gap) {
            debug!(ns, "skip: prev not tight or current not gap");
            return None;
        }

        // Exactly one side moved by exactly one tick; trade at the
        // vanished price.
        if curr_bid == self.prev_bid && i64::from(curr_ask) - i64::from(self.prev_ask) == tick {
            debug!(ns, px = self.prev_ask, "vanished ask, buying");
            self.try_buy(self.prev_ask).map(Action::Trade)
        } else if curr_ask == self.prev_ask
            && i64::from(self.prev_bid) - i64::from(curr_bid) == tick
        {
            debug!(ns, px = self.prev_bid, "vanished bid, selling");
            self.try_sell(self.prev_bid).map(Action::Trade)
        } else {
            debug!(ns, "skip: ambiguous top move");
            None
        }
    }

    fn try_buy(&mut self, price: Price) -> Option<Fill> {
        let headroom = (self.params.max_pos - self.position).max(0) as u64;
        if headroom == 0 {
            debug!("buy blocked: max position reached");
            return None;
        }

        let qty = self.params.order_qty.min(headroom);
        self.realized_pnl -= qty as i64 * i64::from(price);
        self.position += qty as i64;

        Some(Fill {
            side: Side::Buy,
            qty,
            price,
            position: self.position,
            realized_pnl: self.realized_pnl,
        })
    }

    fn try_sell(&mut self, price: Price) -> Option<Fill> {
        let headroom = (self.position - self.params.min_pos).max(0) as u64;
        if headroom == 0 {
            debug!("sell blocked: min position reached");
            return None;
        }

        let qty = self.params.order_qty.min(headroom);
        self.realized_pnl += qty as i64 * i64::from(price);
        self.position -= qty as i64;

        Some(Fill {
            side: Side::Sell,
            qty,
            price,
            position: self.position,
            realized_pnl: self.realized_pnl,
        })
    }

    /// Marks any open position at the last executed price and closes
    /// the day. Idempotent: a closed day settles to `None`.
    pub fn end_of_day(&mut self, book: &OrderBook) -> Option<Settlement> {
        if self.day_closed {
            return None;
        }

        let last = book.last_exec_price();
        if last != 0 && self.position != 0 {
            self.realized_pnl += self.position * i64::from(last);
        }
        self.day_closed = true;

        Some(Settlement {
            last_exec_price: last,
            position: self.position,
            realized_pnl: self.realized_pnl,
        })
    }
}
