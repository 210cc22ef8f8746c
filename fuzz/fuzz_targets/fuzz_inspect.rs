#![no_main]

use libfuzzer_sys::fuzz_target;
use pngverify::{InspectOptions, inspect_bytes};

fuzz_target!(|data: &[u8]| {
    // Signature collection, chunk framing, CRC checks over arbitrary input
    let _ = inspect_bytes(data, &InspectOptions::default());
});
