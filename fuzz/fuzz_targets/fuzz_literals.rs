#![no_main]

use libfuzzer_sys::fuzz_target;
use odata_core::types::{from_uri_literal, to_uri_literal};
use odata_core::{Facets, PrimitiveTypeKind};

fuzz_target!(|data: &[u8]| {
    if data.len() > 512 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    for kind in PrimitiveTypeKind::SCALARS {
        if let Ok(value) = from_uri_literal(kind, s, &Facets::NONE) {
            let literal = to_uri_literal(kind, &value, &Facets::NONE).expect("parsed value formats");
            assert!(
                from_uri_literal(kind, &literal, &Facets::NONE).is_ok(),
                "{kind:?}: `{s}` -> `{literal}` does not parse back"
            );
        }
    }
});
