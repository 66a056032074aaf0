//! Fuzz target: `xl domid` output parser.
#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(id) = domwatch_supervisor::parse_domid(&text) {
        // Whatever was accepted must print back as a parseable id.
        let reparsed = domwatch_supervisor::parse_domid(&id.to_string());
        assert_eq!(reparsed.ok(), Some(id));
    }
});
