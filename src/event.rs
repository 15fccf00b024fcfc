// src/event.rs
//! Decoded feed message model: one [`Event`] per wire message, plus the
//! semantic integer aliases shared across the crate.

use serde::Serialize;

pub type Nanos = u32;
pub type RankingTime = u64;
pub type InstrumentId = u32;
pub type OrderId = u64;
pub type Quantity = u64;
pub type Price = u32;
pub type RankingSeq = u32;

/// Market phase in which order matching is active.
pub const STATE_CONTINUOUS_TRADING: &str = "P_SUREKLI_ISLEM";
/// End-of-day phase; triggers settlement and terminates the run.
pub const STATE_MARKET_CLOSE: &str = "P_MARJ_YAYIN_KAPANIS";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
    #[default]
    Unknown,
}

impl Side {
    /// Wire side codes are ASCII `'B'`/`'S'`; anything else is `Unknown`,
    /// which is tolerated rather than rejected.
    #[inline]
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'B' => Side::Buy,
            b'S' => Side::Sell,
            _ => Side::Unknown,
        }
    }

    #[inline]
    pub fn as_char(self) -> char {
        match self {
            Side::Buy => 'B',
            Side::Sell => 'S',
            Side::Unknown => '?',
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageKind {
    StateChange,
    AddOrder,
    ExecuteOrder,
    DeleteOrder,
    #[default]
    Other,
}

impl MessageKind {
    /// First payload byte discriminates the message kind.
    #[inline]
    pub fn from_byte(b: u8) -> Self {
        match b {
            b'O' => MessageKind::StateChange,
            b'A' => MessageKind::AddOrder,
            b'E' => MessageKind::ExecuteOrder,
            b'D' => MessageKind::DeleteOrder,
            _ => MessageKind::Other,
        }
    }
}

/// One decoded wire message. Only the fields relevant to `kind` are
/// populated; the rest stay at their zero/unknown defaults.
///
/// - `AddOrder`: order_id, side, quantity, price, ranking_time, ranking_seq
/// - `ExecuteOrder`: order_id, side, quantity
/// - `DeleteOrder`: order_id, side
/// - `StateChange`: state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    pub kind: MessageKind,

    pub nanosec: Nanos,
    pub ranking_time: RankingTime,

    pub instrument_id: InstrumentId,
    pub order_id: OrderId,
    pub side: Side,

    pub quantity: Quantity,
    pub price: Price,
    pub ranking_seq: RankingSeq,

    /// Phase string carried by `StateChange` messages, trailing spaces
    /// already trimmed by the decoder.
    pub state: String,
}

impl Event {
    #[inline]
    pub fn is_close_sentinel(&self) -> bool {
        self.kind == MessageKind::StateChange && self.state == STATE_MARKET_CLOSE
    }
}
