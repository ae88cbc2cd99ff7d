//! Fuzz target for free-text query classification
//!
//! Feeds arbitrary strings to the query classifier, which must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() > 1000 {
            return;
        }

        let _ = ferro_vep::region::classify_query(input);
    }
});
