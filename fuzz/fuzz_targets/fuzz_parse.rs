#![no_main]
use libfuzzer_sys::fuzz_target;
use untangle::{parse_str, ParseOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Default options: must never panic
        let _ = parse_str(s, &ParseOptions::default());
        // Namespace processing and interning take different code paths
        let options = ParseOptions::default().namespaces(true).string_interning(true);
        if let Ok(root) = parse_str(s, &options) {
            let _ = root.deep_eq(&root);
            let _ = root.to_string();
        }
    }
});
