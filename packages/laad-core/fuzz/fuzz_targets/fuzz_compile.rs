#![no_main]

use laad_core::compile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if let Ok(output) = compile(source) {
            // Anything that compiles must serialize
            let _ = output.to_json(false);
        }
    }
});
