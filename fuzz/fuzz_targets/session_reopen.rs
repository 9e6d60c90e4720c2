//! Fuzz target for reopening a session over an arbitrary committed container.
//!
//! A scratch container can be damaged between batches. Reopening it must
//! fail with a storage error or succeed, never panic or hang.
//!
//! Run with: cargo +nightly fuzz run session_reopen

#![no_main]

use std::io::Write;

use libfuzzer_sys::fuzz_target;
use zipbatch::storage::{MemorySources, MemoryStorage, Storage};
use zipbatch::{ArchiveEntry, ArchiveSession, NoObserver, SessionKey, SessionOptions};

fuzz_target!(|data: &[u8]| {
    let storage = MemoryStorage::new();
    let sources = MemorySources::new();
    sources.insert("/in/a", b"a");
    let Ok(key) = SessionKey::new("fuzz") else {
        return;
    };
    let mut session = ArchiveSession::new(storage.clone(), key, SessionOptions::new());
    let Ok(entry) = ArchiveEntry::from_path("/in/a") else {
        return;
    };
    if session.run_batch(&sources, &[entry.clone()], &mut NoObserver).is_err() {
        return;
    }

    // Replace the committed container with the fuzz input
    let Ok(mut container) = storage.create("fuzz") else {
        return;
    };
    if container.write_all(data).is_err() || storage.commit("fuzz", container).is_err() {
        return;
    }

    if let Ok(mut handle) = session.open() {
        let _ = handle.append(&sources, &[entry]);
        let _ = handle.close();
    }
});
