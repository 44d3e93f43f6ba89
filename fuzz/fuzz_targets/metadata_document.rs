#![no_main]

use dockmeta_container_metadata::fetch::decode_document;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(doc) = decode_document(data) {
        assert!(doc.is_object());
    }
});
