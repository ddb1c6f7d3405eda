#![no_main]

use laad_core::config::CompilerConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        let _ = CompilerConfig::from_yaml_str(yaml);
    }
});
