//! Reads a transport stream file and prints the table changes and integrity events it produces,
//! followed by per-PID totals.
//!
//!     cargo run --example monitor -- input.ts [config.json]

use mpeg2ts_monitor::monitor::{MonitorConfig, StreamMonitor};
use std::env;
use std::fs::{self, File};
use std::io::Read;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args = env::args().skip(1);
    let name = args.next().expect("usage: monitor <file.ts> [config.json]");
    let config = match args.next() {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("reading {}: {}", path, e));
            serde_json::from_str(&text).unwrap_or_else(|e| panic!("parsing {}: {}", path, e))
        }
        None => MonitorConfig::default(),
    };
    let mut f = File::open(&name).unwrap_or_else(|_| panic!("file not found: {}", &name));

    let mut monitor = StreamMonitor::new(config);
    let mut buf = [0u8; 188 * 1024];
    loop {
        let n = f.read(&mut buf[..]).expect("read failed");
        if n == 0 {
            break;
        }
        let report = monitor.push(&buf[0..n]).expect("decoder misconfigured");
        for change in &report.table_changes {
            println!("{}", change.summary);
        }
        for event in &report.integrity_events {
            println!("{}", serde_json::to_string(event).expect("event serialisation"));
        }
    }

    let tables = monitor.tables();
    for pmt in tables.program_map_tables() {
        let name = tables
            .service_descriptor_for_program(pmt.program_number)
            .map(|s| s.service_name)
            .unwrap_or_default();
        println!("program {} {:?} pcr_pid={:?}", pmt.program_number, name, pmt.pcr_pid);
        for stream in &pmt.elementary_streams {
            println!(
                "  {:?} {:?} ({} descriptors)",
                stream.elementary_pid,
                stream.stream_type,
                stream.descriptors.len()
            );
        }
    }
    for state in monitor.integrity().snapshot() {
        println!("{}", serde_json::to_string(&state).expect("state serialisation"));
    }
    println!(
        "skipped {} bytes, {} malformed batches",
        monitor.skipped_bytes(),
        monitor.malformed_batches()
    );
}
