#![no_main]

use dockmeta_log_enrichment::container_id::normalize;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Some(id) = normalize(data) {
        assert!(!id.as_str().is_empty());
        assert!(data.starts_with(id.as_str()));
        assert!(id
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }
});
