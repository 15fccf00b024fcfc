use std::{collections::HashSet, fs::File, io::BufReader};

use anyhow::Result;

use tickgap::event::MessageKind;
use tickgap::parser::FeedParser;

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/feed.bin".to_string());

    let f = File::open(&path)?;
    let mut parser = FeedParser::new(BufReader::new(f));

    let mut instruments = HashSet::<u32>::new();
    let mut packets = 0u64;
    let mut states = 0u64;
    let mut adds = 0u64;
    let mut execs = 0u64;
    let mut deletes = 0u64;
    let mut others = 0u64;

    while let Some(events) = parser.next_packet()? {
        packets += 1;
        for ev in events {
            match ev.kind {
                MessageKind::StateChange => states += 1,
                MessageKind::AddOrder => adds += 1,
                MessageKind::ExecuteOrder => execs += 1,
                MessageKind::DeleteOrder => deletes += 1,
                MessageKind::Other => others += 1,
            }
            if ev.kind != MessageKind::Other {
                instruments.insert(ev.instrument_id);
            }
        }
    }

    println!("packets={}", packets);
    println!("unique_instruments={}", instruments.len());
    println!("state={}", states);
    println!("add={}", adds);
    println!("exec={}", execs);
    println!("delete={}", deletes);
    println!("other={}", others);
    Ok(())
}
