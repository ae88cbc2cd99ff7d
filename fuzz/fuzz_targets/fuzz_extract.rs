//! Fuzz target for payload extraction
//!
//! Any JSON document is a possible service response; extraction and
//! clinical-significance scoring must never panic on it.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let extractor = ferro_vep::AnnotationExtractor::default();
    let _ = extractor.annotate(&payload, "A");
    let _ = extractor.annotate(&payload, "");
});
