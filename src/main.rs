// src/main.rs
use std::{
    fs::File,
    io::{self, Cursor, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use memmap2::Mmap;
use serde_json::json;
use tracing::info;

use tickgap::{
    engine::{Engine, EngineConfig},
    parser::FeedParser,
    strategy::{StrategyParams, DEFAULT_PRICE_TICK},
};

#[derive(ClapParser, Debug)]
#[command(name = "tickgap", version)]
struct Cli {
    /// Feed file to replay.
    file: PathBuf,
    /// Instrument to reconstruct and trade; everything else is skipped.
    #[arg(long, default_value_t = 73616)]
    instrument: u32,
    /// Simulated order size per fill.
    #[arg(long, default_value_t = 100)]
    order_qty: u64,
    /// Maximum long position.
    #[arg(long, default_value_t = 1000)]
    max_pos: i64,
    /// Minimum position (0 forbids going short).
    #[arg(long, default_value_t = 0)]
    min_pos: i64,
    /// Price tick in kuruş.
    #[arg(long, default_value_t = DEFAULT_PRICE_TICK)]
    tick: u32,
    /// Levels per side in per-batch snapshot output.
    #[arg(long, default_value_t = 3)]
    depth: usize,
    /// Suppress per-batch event and snapshot output.
    #[arg(long, short)]
    quiet: bool,
    /// Write the final book state to this path as JSON.
    #[arg(long)]
    snapshot_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let f = File::open(&cli.file).with_context(|| format!("open feed file {:?}", cli.file))?;
    let mmap = unsafe { Mmap::map(&f)? };
    info!(file = ?cli.file, bytes = mmap.len(), "input");

    let mut parser = FeedParser::new(Cursor::new(mmap.as_ref()));
    let mut engine = Engine::new(
        StrategyParams {
            instrument: cli.instrument,
            order_qty: cli.order_qty,
            max_pos: cli.max_pos,
            min_pos: cli.min_pos,
            tick: cli.tick,
        },
        EngineConfig {
            quiet: cli.quiet,
            depth: cli.depth,
        },
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    engine.run(&mut parser, &mut out)?;

    let strat = engine.strategy();
    let counters = engine.counters();
    let pnl_tl = strat.realized_pnl() as f64 / 1000.0;
    writeln!(
        out,
        "[FINAL] batches={} msgs={} pos={} pnl={} converted to TL: {:.2} TL)",
        counters.batches,
        counters.msgs,
        strat.position(),
        strat.realized_pnl(),
        pnl_tl
    )?;

    if !cli.quiet {
        engine.write_snapshot(&mut out, engine.last_ns(), 5)?;
    }

    if let Some(path) = cli.snapshot_out {
        let (bids, asks) = engine.book().snapshot_n(usize::MAX);
        let payload = json!({
            "type": "final",
            "instrument": cli.instrument,
            "trading_open": engine.book().trading_open(),
            "last_exec_price": engine.book().last_exec_price(),
            "bids": bids,
            "asks": asks,
        });
        std::fs::write(&path, payload.to_string())
            .with_context(|| format!("write final snapshot {:?}", path))?;
        info!(path = ?path, "wrote final snapshot");
    }

    Ok(())
}
