// src/parser.rs
use std::io::Read;

use anyhow::Result;
use tracing::warn;

use crate::event::{Event, MessageKind, Side};

pub const PACKET_HEADER_LEN: usize = 20;
pub const MAX_MESSAGE_COUNT: usize = 10_000;
pub const MAX_MESSAGE_LEN: usize = 65_535;

// Required body bytes after the 1-byte kind discriminator.
const STATE_BODY_LEN: usize = 4 + 4 + 20;
const ADD_BODY_LEN: usize = 4 + 8 + 4 + 1 + 4 + 8 + 4 + 2 + 1 + 8;
const EXEC_BODY_LEN: usize = 4 + 8 + 4 + 1 + 8;
const DELETE_BODY_LEN: usize = 4 + 8 + 4 + 1;

// Unknown kind bytes are routine on a real tape; cap the noise.
const UNKNOWN_KIND_WARN_CAP: u32 = 5;

/// Pull-model decoder for the length-framed packet protocol.
///
/// Each packet is a 20-byte header (10-byte session text, u64 sequence
/// number, u16 message count, integers big-endian) followed by `count`
/// messages, each a u16 length prefix plus payload.
/// [`FeedParser::next_packet`] decodes one packet per call and recovers
/// from corruption without giving up on the stream.
pub struct FeedParser<R> {
    input: R,
    // Reusable payload scratch; grown on demand, never shrunk below
    // MAX_MESSAGE_LEN.
    buf: Vec<u8>,
    unknown_kind_warns: u32,
}

impl<R: Read> FeedParser<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            buf: Vec::with_capacity(MAX_MESSAGE_LEN),
            unknown_kind_warns: 0,
        }
    }

    /// Decodes the next packet.
    ///
    /// Returns `None` at end of source, `Some(events)` otherwise; the
    /// vector is empty when the packet was discarded. Recoverable
    /// corruption (bad count, bad length, truncation) is logged and
    /// skipped; only genuine I/O errors propagate.
    pub fn next_packet(&mut self) -> Result<Option<Vec<Event>>> {
        let mut header = [0u8; PACKET_HEADER_LEN];
        let got = read_full(&mut self.input, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < PACKET_HEADER_LEN {
            warn!(got, "short read on packet header, treating as end of stream");
            return Ok(None);
        }

        // Session text and sequence number are framing-only; neither
        // participates in replay semantics.
        let _session = &header[..10];
        let _seq = be_u64(&header[10..18]);
        let count = be_u16(&header[18..20]) as usize;

        if count == 0 || count > MAX_MESSAGE_COUNT {
            warn!(count, "invalid message count, discarding packet");
            return Ok(Some(Vec::new()));
        }

        let mut events = Vec::with_capacity(count);

        for _ in 0..count {
            let mut lenbuf = [0u8; 2];
            let got = read_full(&mut self.input, &mut lenbuf)?;
            if got < 2 {
                warn!("short read on message length, stopping packet");
                break;
            }

            let msg_len = be_u16(&lenbuf) as usize;
            if msg_len < 1 || msg_len > MAX_MESSAGE_LEN {
                warn!(msg_len, "invalid message length, stopping packet");
                break;
            }

            self.buf.resize(msg_len, 0);
            let got = read_full(&mut self.input, &mut self.buf)?;
            if got < msg_len {
                warn!(want = msg_len, got, "short read on message payload, stopping packet");
                break;
            }

            events.push(parse_message(&self.buf, &mut self.unknown_kind_warns));
        }

        Ok(Some(events))
    }
}

/// Decodes one message payload into an [`Event`]. A payload too short
/// for its kind degrades to `MessageKind::Other` instead of failing the
/// packet.
fn parse_message(buf: &[u8], unknown_kind_warns: &mut u32) -> Event {
    let kind = MessageKind::from_byte(buf[0]);
    let mut ev = Event {
        kind,
        ..Event::default()
    };
    let mut cur = Cur::new(&buf[1..]);

    match kind {
        MessageKind::StateChange => {
            if !cur.has(STATE_BODY_LEN) {
                ev.kind = MessageKind::Other;
                return ev;
            }
            ev.nanosec = cur.u32();
            ev.instrument_id = cur.u32();
            ev.state = trim_state(cur.take(20));
        }

        MessageKind::AddOrder => {
            if !cur.has(ADD_BODY_LEN) {
                ev.kind = MessageKind::Other;
                return ev;
            }
            ev.nanosec = cur.u32();
            ev.order_id = cur.u64();
            ev.instrument_id = cur.u32();
            ev.side = Side::from_byte(cur.u8());
            ev.ranking_seq = cur.u32();
            ev.quantity = cur.u64();
            ev.price = cur.u32();
            cur.skip(2); // order attributes
            cur.skip(1); // lot type
            ev.ranking_time = cur.u64();
        }

        MessageKind::ExecuteOrder => {
            if !cur.has(EXEC_BODY_LEN) {
                ev.kind = MessageKind::Other;
                return ev;
            }
            ev.nanosec = cur.u32();
            ev.order_id = cur.u64();
            ev.instrument_id = cur.u32();
            ev.side = Side::from_byte(cur.u8());
            ev.quantity = cur.u64();

            // Optional tail: match id, combo group, two reserved runs.
            if cur.has(8) {
                cur.skip(8);
            }
            if cur.has(4) {
                cur.skip(4);
            }
            if cur.has(7) {
                cur.skip(7);
            }
            if cur.has(7) {
                cur.skip(7);
            }
        }

        MessageKind::DeleteOrder => {
            if !cur.has(DELETE_BODY_LEN) {
                ev.kind = MessageKind::Other;
                return ev;
            }
            ev.nanosec = cur.u32();
            ev.order_id = cur.u64();
            ev.instrument_id = cur.u32();
            ev.side = Side::from_byte(cur.u8());
        }

        MessageKind::Other => {
            if *unknown_kind_warns < UNKNOWN_KIND_WARN_CAP {
                warn!(kind_byte = buf[0], "unknown message kind");
                *unknown_kind_warns += 1;
            }
        }
    }

    ev
}

// The state field is fixed-width text, space-padded on the right.
fn trim_state(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Bounds-tracking cursor over one message body.
struct Cur<'a> {
    rest: &'a [u8],
}

impl<'a> Cur<'a> {
    fn new(rest: &'a [u8]) -> Self {
        Self { rest }
    }

    #[inline]
    fn has(&self, n: usize) -> bool {
        self.rest.len() >= n
    }

    #[inline]
    fn take(&mut self, n: usize) -> &'a [u8] {
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        head
    }

    #[inline]
    fn skip(&mut self, n: usize) {
        self.rest = &self.rest[n..];
    }

    #[inline]
    fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    #[inline]
    fn u32(&mut self) -> u32 {
        let b = self.take(4);
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }

    #[inline]
    fn u64(&mut self) -> u64 {
        let b = self.take(8);
        u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    }
}

#[inline]
fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

#[inline]
fn be_u64(b: &[u8]) -> u64 {
    u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

/// Reads until `buf` is full or the source is exhausted; returns the
/// bytes read. `read_exact` cannot distinguish a clean EOF from a
/// truncated tail, and the recovery rules treat those differently.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
