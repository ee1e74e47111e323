#![no_main]

use libfuzzer_sys::fuzz_target;
use odata_core::ODataLimits;
use odata_core::query::parse_query;

fuzz_target!(|data: &[u8]| {
    if data.len() > 2048 {
        return;
    }
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_query(s, &ODataLimits::default());
    }
});
