#![no_main]

use libfuzzer_sys::fuzz_target;
use nrbfscope::{analyze, decode_with, DecoderConfig};

fuzz_target!(|data: &[u8]| {
    let config = DecoderConfig {
        max_array_slots: 1 << 16,
        ..DecoderConfig::default()
    };

    if let Ok((registry, _)) = decode_with(data, config) {
        let _ = analyze(&registry).to_string();
    }
});
