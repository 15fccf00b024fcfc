// src/metrics.rs
use tracing::info;

/// Run counters for the final summary. The engine is single-threaded,
/// so plain integers suffice.
#[derive(Clone, Copy, Debug, Default)]
pub struct Counters {
    pub packets: u64,
    pub packets_discarded: u64,
    /// Events applied to the book (target instrument only).
    pub msgs: u64,
    /// Events dropped before the book: foreign instrument or unknown kind.
    pub msgs_skipped: u64,
    pub batches: u64,
    pub trades: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_packets(&mut self) {
        self.packets += 1;
    }

    #[inline]
    pub fn inc_packets_discarded(&mut self) {
        self.packets_discarded += 1;
    }

    #[inline]
    pub fn inc_msgs(&mut self) {
        self.msgs += 1;
    }

    #[inline]
    pub fn inc_msgs_skipped(&mut self) {
        self.msgs_skipped += 1;
    }

    #[inline]
    pub fn inc_batches(&mut self) {
        self.batches += 1;
    }

    #[inline]
    pub fn inc_trades(&mut self) {
        self.trades += 1;
    }

    pub fn log_summary(&self) {
        info!(
            packets = self.packets,
            packets_discarded = self.packets_discarded,
            msgs = self.msgs,
            msgs_skipped = self.msgs_skipped,
            batches = self.batches,
            trades = self.trades,
            "run counters"
        );
    }
}
