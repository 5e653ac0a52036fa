//! Fuzz target for request canonicalization.
//!
//! Canonicalizing must be idempotent for both query strings and JSON
//! bodies.

#![no_main]

use libfuzzer_sys::fuzz_target;
use shopino_signing::{canonicalize_json_bytes, canonicalize_query_string};

fuzz_target!(|data: &[u8]| {
    if let Ok(query) = std::str::from_utf8(data) {
        let once = canonicalize_query_string(query);
        assert_eq!(canonicalize_query_string(&once), once);
    }

    if let Ok(once) = canonicalize_json_bytes(data) {
        let twice = canonicalize_json_bytes(&once).unwrap();
        assert_eq!(twice, once);
    }
});
