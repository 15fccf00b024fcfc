// src/wire.rs
//! Encoders for the framed packet protocol. The replay engine only
//! decodes; these builders exist so tests and tools can fabricate
//! byte-exact feeds.

use bytes::{BufMut, Bytes, BytesMut};

use crate::event::{
    InstrumentId, Nanos, OrderId, Price, Quantity, RankingSeq, RankingTime, Side,
};

pub fn encode_state(ns: Nanos, instrument: InstrumentId, state: &str) -> Bytes {
    let mut out = BytesMut::with_capacity(1 + 4 + 4 + 20);
    out.put_u8(b'O');
    out.put_u32(ns);
    out.put_u32(instrument);

    // Fixed-width field, space-padded on the right.
    let mut field = [b' '; 20];
    let s = state.as_bytes();
    let n = s.len().min(field.len());
    field[..n].copy_from_slice(&s[..n]);
    out.put_slice(&field);

    out.freeze()
}

pub fn encode_add(
    ns: Nanos,
    order_id: OrderId,
    instrument: InstrumentId,
    side: Side,
    ranking_seq: RankingSeq,
    quantity: Quantity,
    price: Price,
    ranking_time: RankingTime,
) -> Bytes {
    let mut out = BytesMut::with_capacity(1 + 44);
    out.put_u8(b'A');
    out.put_u32(ns);
    out.put_u64(order_id);
    out.put_u32(instrument);
    out.put_u8(side.as_char() as u8);
    out.put_u32(ranking_seq);
    out.put_u64(quantity);
    out.put_u32(price);
    out.put_u16(0); // order attributes
    out.put_u8(0); // lot type
    out.put_u64(ranking_time);
    out.freeze()
}

/// Execute body without the optional match-id/combo/reserved tail.
pub fn encode_execute(
    ns: Nanos,
    order_id: OrderId,
    instrument: InstrumentId,
    side: Side,
    quantity: Quantity,
) -> Bytes {
    let mut out = BytesMut::with_capacity(1 + 25);
    out.put_u8(b'E');
    out.put_u32(ns);
    out.put_u64(order_id);
    out.put_u32(instrument);
    out.put_u8(side.as_char() as u8);
    out.put_u64(quantity);
    out.freeze()
}

pub fn encode_delete(
    ns: Nanos,
    order_id: OrderId,
    instrument: InstrumentId,
    side: Side,
) -> Bytes {
    let mut out = BytesMut::with_capacity(1 + 17);
    out.put_u8(b'D');
    out.put_u32(ns);
    out.put_u64(order_id);
    out.put_u32(instrument);
    out.put_u8(side.as_char() as u8);
    out.freeze()
}

/// Assembles one packet: 20-byte header followed by length-prefixed
/// message bodies.
pub struct PacketBuilder {
    session: [u8; 10],
    seq: u64,
    msgs: Vec<Bytes>,
}

impl PacketBuilder {
    pub fn new(session: &str, seq: u64) -> Self {
        let mut field = [b' '; 10];
        let s = session.as_bytes();
        let n = s.len().min(field.len());
        field[..n].copy_from_slice(&s[..n]);
        Self {
            session: field,
            seq,
            msgs: Vec::new(),
        }
    }

    pub fn msg(mut self, body: Bytes) -> Self {
        self.msgs.push(body);
        self
    }

    pub fn build(self) -> Bytes {
        let payload: usize = self.msgs.iter().map(|m| 2 + m.len()).sum();
        let mut out = BytesMut::with_capacity(20 + payload);
        out.put_slice(&self.session);
        out.put_u64(self.seq);
        out.put_u16(self.msgs.len() as u16);
        for m in &self.msgs {
            out.put_u16(m.len() as u16);
            out.put_slice(m);
        }
        out.freeze()
    }
}
