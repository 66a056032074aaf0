//! Fuzz target: `xl list -v` output parser.
//!
//! The parser reads toolstack output that may be truncated or garbled and
//! must never panic regardless of input.
#![no_main]

use domwatch_core::ShutdownReason;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(status) = domwatch_supervisor::parse_list_verbose(&text) {
        // A parsed row always carries a UUID, and only shut down domains
        // carry a reason.
        assert!(status.uuid.is_some());
        assert!(status.shutdown || status.reason == ShutdownReason::None);
    }
});
