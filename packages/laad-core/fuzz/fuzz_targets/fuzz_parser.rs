#![no_main]

use laad_core::parse;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        // Malformed source must surface as a SyntaxError, never a panic
        let _ = parse(source);
    }
});
