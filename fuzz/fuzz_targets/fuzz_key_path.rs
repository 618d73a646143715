#![no_main]

use libfuzzer_sys::fuzz_target;
use pathbind_core::{KeyPath, ROOT_SEGMENT};

fuzz_target!(|text: &str| {
    let Ok(path) = KeyPath::parse(text) else {
        return;
    };

    assert!(!path.is_empty());
    assert_eq!(path.segment(0), Some(ROOT_SEGMENT));
    assert!(path.segments().iter().all(|s| !s.is_empty()));

    // Display is the canonical form and parses back to the same segments.
    let rendered = path.to_string();
    assert_eq!(rendered, text);
    let reparsed = KeyPath::parse(&rendered).expect("rendered path parses");
    assert_eq!(reparsed.segments(), path.segments());
});
