#![no_main]

use hermit_shard::mnemonic::decode_mnemonic;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Try decoding arbitrary bytes as a SLIP-39 share mnemonic phrase.
    // decode_mnemonic must never panic — it should always return Ok or Err.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = decode_mnemonic(s);
    }
});
