// src/engine.rs
//! The replay loop: pulls packets from the decoder, groups consecutive
//! same-nanosecond events for the target instrument into batches,
//! applies each event to the book in tape order, then hands the
//! completed batch to the strategy. The book always absorbs the whole
//! batch before the strategy sees it, which is what makes
//! same-nanosecond sequences atomic from the strategy's viewpoint.

use std::io::{Read, Write};

use anyhow::Result;
use tracing::info;

use crate::book::OrderBook;
use crate::event::{Event, MessageKind, Nanos, Side, STATE_CONTINUOUS_TRADING};
use crate::metrics::Counters;
use crate::parser::FeedParser;
use crate::strategy::{Action, Fill, Settlement, Strategy, StrategyParams};

#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Suppresses per-batch event and snapshot output; report lines
    /// ([DAY START], [DAY END], [TRADE], [EOD]) stay on.
    pub quiet: bool,
    /// Levels per side in the per-batch snapshot block.
    pub depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quiet: false,
            depth: 3,
        }
    }
}

pub struct Engine {
    book: OrderBook,
    strategy: Strategy,
    cfg: EngineConfig,
    counters: Counters,
    seen_open: bool,
    last_ns: Nanos,
}

impl Engine {
    pub fn new(params: StrategyParams, cfg: EngineConfig) -> Self {
        Self {
            book: OrderBook::new(),
            strategy: Strategy::new(params),
            cfg,
            counters: Counters::new(),
            seen_open: false,
            last_ns: 0,
        }
    }

    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    #[inline]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    #[inline]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Nanosecond stamp of the most recently flushed batch.
    #[inline]
    pub fn last_ns(&self) -> Nanos {
        self.last_ns
    }

    /// Drains the feed until the close sentinel or end of source,
    /// writing report lines to `out`.
    pub fn run<R: Read, W: Write>(
        &mut self,
        parser: &mut FeedParser<R>,
        out: &mut W,
    ) -> Result<()> {
        let mut batch: Vec<Event> = Vec::with_capacity(64);
        let mut batch_ns: Nanos = 0;

        'packets: while let Some(events) = parser.next_packet()? {
            self.counters.inc_packets();
            if events.is_empty() {
                self.counters.inc_packets_discarded();
                continue;
            }

            for ev in events {
                if ev.kind == MessageKind::Other
                    || ev.instrument_id != self.strategy.instrument()
                {
                    self.counters.inc_msgs_skipped();
                    continue;
                }

                if ev.kind == MessageKind::StateChange {
                    info!(ns = ev.nanosec, state = %ev.state, "instrument state");
                    if !self.seen_open && ev.state == STATE_CONTINUOUS_TRADING {
                        self.seen_open = true;
                        writeln!(out, "[DAY START] Continuous trading begins.")?;
                    }
                }

                // Nanosecond boundary before apply: a new stamp closes
                // the previous batch.
                if batch.is_empty() {
                    batch_ns = ev.nanosec;
                } else if ev.nanosec != batch_ns {
                    self.flush_batch(batch_ns, &mut batch, out)?;
                    batch_ns = ev.nanosec;
                }

                let closing = ev.is_close_sentinel();
                self.book.apply(&ev);
                batch.push(ev);
                self.counters.inc_msgs();

                if closing {
                    writeln!(out, "[DAY END] Market closed.")?;
                    self.flush_batch(batch_ns, &mut batch, out)?;
                    break 'packets;
                }
            }
        }

        self.flush_batch(batch_ns, &mut batch, out)?;
        self.counters.log_summary();
        Ok(())
    }

    fn flush_batch<W: Write>(
        &mut self,
        ns: Nanos,
        batch: &mut Vec<Event>,
        out: &mut W,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        self.counters.inc_batches();
        self.last_ns = ns;

        if !self.cfg.quiet {
            writeln!(out)?;
            writeln!(out, "=== BATCH ns={} ({} events) ===", ns, batch.len())?;
            for ev in batch.iter() {
                write_event_line(out, ev)?;
            }
        }

        match self.strategy.on_batch(ns, &self.book, batch) {
            Some(Action::Trade(fill)) => {
                self.counters.inc_trades();
                write_trade_line(out, &fill)?;
            }
            Some(Action::Settled(settlement)) => {
                write_settlement_line(out, &settlement)?;
            }
            None => {}
        }

        if !self.cfg.quiet {
            self.write_snapshot(out, ns, self.cfg.depth)?;
        }

        batch.clear();
        Ok(())
    }

    /// Top-N snapshot block in the report format.
    pub fn write_snapshot<W: Write>(&self, out: &mut W, ns: Nanos, depth: usize) -> Result<()> {
        let (bids, asks) = self.book.snapshot_n(depth);

        writeln!(
            out,
            "---- SNAPSHOT ns={} book={} open={} ----",
            ns,
            self.strategy.instrument(),
            if self.book.trading_open() { "Y" } else { "N" }
        )?;

        writeln!(out, "BIDS (price, qty):")?;
        for (i, lv) in bids.iter().enumerate() {
            writeln!(out, "  [{}] {}, {}", i, lv.px, lv.qty)?;
        }
        if bids.is_empty() {
            writeln!(out, "  (none)")?;
        }

        writeln!(out, "ASKS (price, qty):")?;
        for (i, lv) in asks.iter().enumerate() {
            writeln!(out, "  [{}] {}, {}", i, lv.px, lv.qty)?;
        }
        if asks.is_empty() {
            writeln!(out, "  (none)")?;
        }

        if self.book.has_top() {
            writeln!(
                out,
                "BEST: bid {} x {} | ask {} x {}",
                self.book.best_bid_price(),
                self.book.best_bid_quantity(),
                self.book.best_ask_price(),
                self.book.best_ask_quantity()
            )?;
        }
        writeln!(out, "------------------------------")?;
        Ok(())
    }
}

fn write_event_line<W: Write>(out: &mut W, ev: &Event) -> std::io::Result<()> {
    match ev.kind {
        MessageKind::StateChange => writeln!(
            out,
            "[MSG] ns={} type=STATE book={} state={}",
            ev.nanosec, ev.instrument_id, ev.state
        ),
        MessageKind::AddOrder => writeln!(
            out,
            "[MSG] ns={} type=ADD id={} side={} qty={} px={}",
            ev.nanosec,
            ev.order_id,
            ev.side.as_char(),
            ev.quantity,
            ev.price
        ),
        MessageKind::ExecuteOrder => writeln!(
            out,
            "[MSG] ns={} type=EXEC id={} side={} qty={}",
            ev.nanosec,
            ev.order_id,
            ev.side.as_char(),
            ev.quantity
        ),
        MessageKind::DeleteOrder => writeln!(
            out,
            "[MSG] ns={} type=DEL id={} side={}",
            ev.nanosec,
            ev.order_id,
            ev.side.as_char()
        ),
        MessageKind::Other => writeln!(out, "[MSG] ns={} type=OTHER", ev.nanosec),
    }
}

fn write_trade_line<W: Write>(out: &mut W, fill: &Fill) -> std::io::Result<()> {
    // The extra space after BUY keeps the columns aligned with SELL.
    let tag = match fill.side {
        Side::Buy => "BUY ",
        _ => "SELL",
    };
    writeln!(
        out,
        "[TRADE] {} {} @ {} pos={} pnl={}",
        tag, fill.qty, fill.price, fill.position, fill.realized_pnl
    )
}

fn write_settlement_line<W: Write>(out: &mut W, s: &Settlement) -> std::io::Result<()> {
    writeln!(
        out,
        "[EOD] Close. last_exec_price={} final_pos={} final_pnl={}",
        s.last_exec_price, s.position, s.realized_pnl
    )
}
