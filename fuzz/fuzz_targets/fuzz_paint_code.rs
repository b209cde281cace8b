#![no_main]

use libfuzzer_sys::fuzz_target;
use u1convert::parser::paint::decode_slots;

fuzz_target!(|data: &[u8]| {
    if let Ok(code) = std::str::from_utf8(data) {
        let _ = decode_slots(code);
    }
});
