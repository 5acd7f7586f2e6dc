//! The console stand-in for Hermit's camera/display adapters.
//!
//! The core spec treats display and camera as narrow capability adapters
//! selected from configuration (`io.display`, `io.camera`); this build
//! backs only the `ascii` display (print each animated-QR frame as text) and
//! a console-driven receive loop, since no camera/framebuffer/opencv driver
//! belongs in an air-gapped signing core.

use anyhow::{bail, Result};
use hermit_optical::{create_qr_sequence, Reassembler};
use std::io::BufRead;

use crate::config::Config;

/// Emit `payload` as an animated BCUR-multi QR sequence. With `display =
/// ascii`, each frame is printed as its raw fragment text.
pub fn emit(config: &Config, payload: &[u8]) -> Result<()> {
    let sequence = create_qr_sequence(payload)?;
    match config.io.display.as_str() {
        "ascii" => {
            println!(
                "-- optical channel: {} fragment(s), {} ms/frame --",
                sequence.len(),
                config.io.qr_code_sequence_delay
            );
            for (i, fragment) in sequence.iter().enumerate() {
                println!("[{}/{}] {fragment}", i + 1, sequence.len());
            }
            Ok(())
        }
        other => bail!("display driver '{other}' has no adapter in this build; use 'ascii'"),
    }
}

/// Read fragment lines from stdin until the reassembler completes, a blank
/// line is entered, or EOF. Returns the reassembled payload bytes.
pub fn receive(_config: &Config) -> Result<Vec<u8>> {
    println!("-- optical channel: paste QR fragment lines, blank line to abort --");
    let mut reassembler = Reassembler::new();
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            bail!("optical receive aborted: no input");
        }
        reassembler.collect(line)?;
        let (received, total) = reassembler.progress();
        println!("({received}/{total})");
        if reassembler.is_complete() {
            return Ok(reassembler.decode()?);
        }
    }
    bail!("optical receive aborted: end of input before the sequence completed")
}
