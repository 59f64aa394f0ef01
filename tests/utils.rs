#![allow(dead_code)]

use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn enable_logging() {
    LOGGER.call_once(logger_init)
}

fn logger_init() {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Warn)
        .init();
}

/// A minimal format-0, single-track file: one note-on at pulse 0, EndOfTrack immediately after.
pub fn minimal_smf_bytes() -> Vec<u8> {
    vec![
        0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x60, 0x4D,
        0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x08, 0x00, 0x90, 0x3C, 0x7F, 0x00, 0xFF, 0x2F, 0x00,
    ]
}
