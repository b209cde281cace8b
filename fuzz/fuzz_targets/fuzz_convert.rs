#![no_main]

use libfuzzer_sys::fuzz_target;
use u1convert::parser::{extract_filaments, parse_model_document, parse_settings_document};

fuzz_target!(|data: &[u8]| {
    // Everything a conversion reads from the source archive
    let Ok(package) = u1convert::opc::open(data) else {
        return;
    };
    let _ = parse_model_document(&package);
    if let Ok(settings) = parse_settings_document(&package) {
        let _ = extract_filaments(&package, &settings);
    }
});
