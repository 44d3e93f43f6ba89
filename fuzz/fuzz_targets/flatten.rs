#![no_main]

use dockmeta_core::config::KeyNaming;
use dockmeta_log_enrichment::{flatten_ecs, flatten_generic};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let _ = flatten_generic(&doc, KeyNaming::Dotted);
    let _ = flatten_generic(&doc, KeyNaming::Literal);
    let _ = flatten_ecs(&doc);
});
