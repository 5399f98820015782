#![no_main]

use libfuzzer_sys::fuzz_target;
use mpeg2ts_monitor::monitor::{MonitorConfig, StreamMonitor};

fuzz_target!(|data: &[u8]| {
    let mut monitor = StreamMonitor::new(MonitorConfig::default());
    // split so that partial packets are carried between calls
    let (first, second) = data.split_at(data.len() / 2);
    let _ = monitor.push(first);
    let _ = monitor.push(second);
    let tables = monitor.tables();
    for pmt in tables.program_map_tables() {
        let _ = tables.service_descriptor_for_program(pmt.program_number);
    }
    let _ = monitor.integrity().roll_period();
});
