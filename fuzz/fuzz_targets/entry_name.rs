//! Fuzz target for EntryName::new with arbitrary string input.
//!
//! Run with: cargo +nightly fuzz run entry_name
//!
//! Properties checked for every accepted name:
//! - No `.` or `..` segments and no empty segments
//! - Not absolute
//! - No NUL bytes or backslashes
//! - Suffixed variants are accepted as well

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(name_str) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(name) = zipbatch::EntryName::new(name_str) else {
        return;
    };
    let normalized = name.as_str();

    assert!(!normalized.starts_with('/'), "Absolute name accepted: {:?}", normalized);
    assert!(!normalized.contains('\0'), "NUL byte in name: {:?}", normalized);
    assert!(!normalized.contains('\\'), "Backslash survived normalization: {:?}", normalized);
    for segment in normalized.split('/') {
        assert!(
            !segment.is_empty() && segment != "." && segment != "..",
            "Bad segment {:?} in {:?}",
            segment,
            normalized
        );
    }

    if let Ok(renamed) = name.with_suffix(7) {
        assert!(
            zipbatch::EntryName::new(renamed.as_str()).is_ok(),
            "Suffixed name rejected: {:?}",
            renamed
        );
    }
});
