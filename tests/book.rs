// tests/book.rs
use tickgap::book::OrderBook;
use tickgap::event::{
    Event, InstrumentId, MessageKind, OrderId, Price, Quantity, RankingSeq, RankingTime, Side,
    STATE_CONTINUOUS_TRADING, STATE_MARKET_CLOSE,
};

const BOOK: InstrumentId = 123;

fn make_state(state: &str, ns: u32) -> Event {
    Event {
        kind: MessageKind::StateChange,
        instrument_id: BOOK,
        state: state.to_string(),
        nanosec: ns,
        ..Event::default()
    }
}

fn make_add(
    id: OrderId,
    side: Side,
    px: Price,
    qty: Quantity,
    rt: RankingTime,
    rs: RankingSeq,
    ns: u32,
) -> Event {
    Event {
        kind: MessageKind::AddOrder,
        instrument_id: BOOK,
        order_id: id,
        side,
        price: px,
        quantity: qty,
        ranking_time: rt,
        ranking_seq: rs,
        nanosec: ns,
        ..Event::default()
    }
}

fn make_exec(id: OrderId, side: Side, qty: Quantity, ns: u32) -> Event {
    Event {
        kind: MessageKind::ExecuteOrder,
        instrument_id: BOOK,
        order_id: id,
        side,
        quantity: qty,
        nanosec: ns,
        ..Event::default()
    }
}

fn make_del(id: OrderId, side: Side, ns: u32) -> Event {
    Event {
        kind: MessageKind::DeleteOrder,
        instrument_id: BOOK,
        order_id: id,
        side,
        nanosec: ns,
        ..Event::default()
    }
}

/// Bids 100/90/80, asks 110/120/130, one lot each.
fn seeded_book() -> OrderBook {
    let mut ob = OrderBook::new();
    ob.apply(&make_state(STATE_CONTINUOUS_TRADING, 1));
    ob.apply(&make_add(1000, Side::Buy, 100, 1000, 1, 1, 2));
    ob.apply(&make_add(1001, Side::Buy, 90, 1000, 1, 2, 2));
    ob.apply(&make_add(1002, Side::Buy, 80, 1000, 1, 3, 2));
    ob.apply(&make_add(2000, Side::Sell, 110, 1000, 1, 1, 2));
    ob.apply(&make_add(2001, Side::Sell, 120, 1000, 1, 2, 2));
    ob.apply(&make_add(2002, Side::Sell, 130, 1000, 1, 3, 2));
    ob
}

#[test]
fn empty_book_queries_return_zero() {
    let ob = OrderBook::new();
    assert!(!ob.has_top());
    assert!(ob.is_empty());
    assert_eq!(ob.best_bid_price(), 0);
    assert_eq!(ob.best_bid_quantity(), 0);
    assert_eq!(ob.best_ask_price(), 0);
    assert_eq!(ob.best_ask_quantity(), 0);
    assert_eq!(ob.last_exec_price(), 0);
    assert_eq!(ob.order_count(), 0);
}

#[test]
fn trading_state_follows_sentinel() {
    let mut ob = OrderBook::new();
    assert!(!ob.trading_open());
    ob.apply(&make_state(STATE_CONTINUOUS_TRADING, 1));
    assert!(ob.trading_open());
    ob.apply(&make_state(STATE_MARKET_CLOSE, 2));
    assert!(!ob.trading_open());
}

#[test]
fn seeded_top_of_book() {
    let ob = seeded_book();
    assert!(ob.has_top());
    assert_eq!(ob.best_bid_price(), 100);
    assert_eq!(ob.best_bid_quantity(), 1000);
    assert_eq!(ob.best_ask_price(), 110);
    assert_eq!(ob.best_ask_quantity(), 1000);
    assert_eq!(ob.order_count(), 6);
    ob.assert_invariants();
}

#[test]
fn snapshot_orders_best_first_and_caps_depth() {
    let ob = seeded_book();
    let (bids, asks) = ob.snapshot_n(2);
    assert_eq!(bids.iter().map(|l| l.px).collect::<Vec<_>>(), vec![100, 90]);
    assert_eq!(asks.iter().map(|l| l.px).collect::<Vec<_>>(), vec![110, 120]);
}

#[test]
fn partial_execute_reduces_level() {
    let mut ob = seeded_book();
    ob.apply(&make_exec(2000, Side::Sell, 400, 3));
    assert_eq!(ob.best_ask_price(), 110);
    assert_eq!(ob.best_ask_quantity(), 600);
    assert_eq!(ob.last_exec_price(), 110);
    assert_eq!(ob.order_count(), 6);
    ob.assert_invariants();
}

#[test]
fn exact_execute_removes_order_and_level() {
    let mut ob = seeded_book();
    ob.apply(&make_exec(2000, Side::Sell, 1000, 3));
    assert_eq!(ob.best_ask_price(), 120);
    assert_eq!(ob.order_count(), 5);
    ob.assert_invariants();
}

#[test]
fn over_execute_counts_as_full_removal() {
    let mut ob = seeded_book();
    ob.apply(&make_exec(2000, Side::Sell, 5000, 3));
    assert_eq!(ob.best_ask_price(), 120);
    assert_eq!(ob.order_count(), 5);
    ob.assert_invariants();
}

#[test]
fn execute_for_unknown_id_is_ignored() {
    let mut ob = seeded_book();
    let (bids_before, asks_before) = ob.snapshot_n(10);
    ob.apply(&make_exec(9999, Side::Sell, 100, 3));
    assert_eq!(ob.snapshot_n(10), (bids_before, asks_before));
    assert_eq!(ob.last_exec_price(), 0);
    ob.assert_invariants();
}

#[test]
fn suspicious_execute_quantity_is_ignored() {
    let mut ob = seeded_book();
    ob.apply(&make_exec(2000, Side::Sell, 0, 3));
    ob.apply(&make_exec(2000, Side::Sell, 2_000_000_000, 3));
    assert_eq!(ob.best_ask_quantity(), 1000);
    ob.assert_invariants();
}

#[test]
fn delete_for_unknown_id_is_ignored() {
    let mut ob = seeded_book();
    ob.apply(&make_del(9999, Side::Buy, 3));
    assert_eq!(ob.order_count(), 6);
    ob.assert_invariants();
}

#[test]
fn delete_removes_regardless_of_remaining_quantity() {
    let mut ob = seeded_book();
    ob.apply(&make_exec(1000, Side::Buy, 300, 3));
    ob.apply(&make_del(1000, Side::Buy, 4));
    assert_eq!(ob.best_bid_price(), 90);
    assert_eq!(ob.order_count(), 5);
    ob.assert_invariants();
}

#[test]
fn add_then_delete_restores_the_book() {
    let mut ob = seeded_book();
    let before = ob.snapshot_n(10);
    ob.apply(&make_add(7777, Side::Buy, 95, 500, 9, 9, 3));
    ob.apply(&make_del(7777, Side::Buy, 3));
    assert_eq!(ob.snapshot_n(10), before);
    assert_eq!(ob.order_count(), 6);
    ob.assert_invariants();
}

#[test]
fn single_add_then_delete_leaves_empty_book() {
    let mut ob = OrderBook::new();
    ob.apply(&make_add(1, Side::Buy, 100, 1000, 1, 1, 1));
    ob.apply(&make_del(1, Side::Buy, 2));
    assert!(ob.is_empty());
    assert_eq!(ob.order_count(), 0);
    ob.assert_invariants();
}

#[test]
fn duplicate_add_evicts_the_resting_order() {
    let mut ob = seeded_book();
    // Same id resurfaces at a new price; the old resting order must not
    // linger in the 110 level.
    ob.apply(&make_add(2000, Side::Sell, 115, 700, 5, 1, 3));
    assert_eq!(ob.order_count(), 6);
    assert_eq!(ob.best_ask_price(), 115);
    assert_eq!(ob.best_ask_quantity(), 700);
    ob.assert_invariants();
}

#[test]
fn zero_price_or_quantity_add_is_accepted_with_warning() {
    let mut ob = OrderBook::new();
    ob.apply(&make_add(1, Side::Buy, 0, 1000, 1, 1, 1));
    ob.apply(&make_add(2, Side::Sell, 100, 0, 1, 1, 1));
    // Zero-aggregate and zero-price levels exist but never surface as
    // best prices.
    assert_eq!(ob.best_ask_price(), 0);
    assert_eq!(ob.order_count(), 2);
    assert!(ob.has_top());
    ob.assert_invariants();
}

#[test]
fn crossed_input_does_not_crash() {
    let mut ob = OrderBook::new();
    ob.apply(&make_add(1, Side::Buy, 120, 1000, 1, 1, 1));
    ob.apply(&make_add(2, Side::Sell, 100, 1000, 1, 2, 1));
    assert_eq!(ob.best_bid_price(), 120);
    assert_eq!(ob.best_ask_price(), 100);
    ob.assert_invariants();
}

#[test]
fn last_exec_price_tracks_latest_execution() {
    let mut ob = seeded_book();
    ob.apply(&make_exec(2000, Side::Sell, 100, 3));
    assert_eq!(ob.last_exec_price(), 110);
    ob.apply(&make_exec(1000, Side::Buy, 100, 4));
    assert_eq!(ob.last_exec_price(), 100);
}

#[test]
fn ranking_ties_keep_arrival_order() {
    let mut ob = OrderBook::new();
    // Same (ranking_time, ranking_seq): later arrivals append after the
    // tied run, never before it.
    ob.apply(&make_add(1, Side::Buy, 100, 100, 5, 5, 1));
    ob.apply(&make_add(2, Side::Buy, 100, 200, 5, 5, 1));
    ob.apply(&make_add(3, Side::Buy, 100, 300, 5, 5, 1));
    assert_eq!(ob.best_bid_quantity(), 600);
    ob.assert_invariants();
}
