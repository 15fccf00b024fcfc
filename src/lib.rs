//! # tickgap - Framed Feed Replay and Spread-Gap Simulation
//!
//! This crate replays a length-framed binary market-data feed, rebuilds
//! a per-instrument limit order book in real time, and runs a
//! deterministic strategy that trades the transient widening of the
//! top-of-book spread from one tick to two.
//!
//! ## Architecture
//!
//! The engine consists of several key components:
//! - **Parser**: decodes framed packets into typed events with
//!   field-level bounds checks and per-packet corruption recovery
//! - **OrderBook**: price-time-priority book with FIFO levels and an
//!   order-id index
//! - **Strategy**: state machine over per-batch top-of-book snapshots,
//!   with position limits, realized P&L and end-of-day settlement
//! - **Engine**: nanosecond batch loop wiring the three together and
//!   rendering the report
//!
//! Processing is strictly single-threaded: the engine pulls packets,
//! applies events in tape order, and runs the strategy once per
//! completed nanosecond batch.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use tickgap::{
//!     engine::{Engine, EngineConfig},
//!     parser::FeedParser,
//!     strategy::StrategyParams,
//! };
//!
//! let feed: Vec<u8> = std::fs::read("data/feed.bin").unwrap();
//! let mut parser = FeedParser::new(Cursor::new(feed));
//! let mut engine = Engine::new(
//!     StrategyParams {
//!         instrument: 73616,
//!         ..StrategyParams::default()
//!     },
//!     EngineConfig::default(),
//! );
//!
//! let mut out = Vec::new();
//! engine.run(&mut parser, &mut out).unwrap();
//! ```
pub mod book;
pub mod engine;
pub mod event;
pub mod metrics;
pub mod parser;
pub mod strategy;
pub mod wire;
