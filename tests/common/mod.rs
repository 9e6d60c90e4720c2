//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Cursor;

use zipbatch::storage::{MemoryArtifactStore, MemorySources, MemoryStorage};
use zipbatch::{
    ArchiveEntry, ArchiveSession, BatchTracker, FinalizeOptions, Finalizer, SessionKey,
    SessionOptions,
};

/// Tracker wired entirely to in-memory stores.
pub type MemoryTracker = BatchTracker<MemoryStorage, MemorySources, MemoryArtifactStore>;

/// In-memory fixtures for one bulk operation.
///
/// All stores are shared handles, so the fixture can inspect and inject
/// faults while the tracker owns its own clones.
pub struct Fixture {
    pub storage: MemoryStorage,
    pub sources: MemorySources,
    pub artifacts: MemoryArtifactStore,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            storage: MemoryStorage::new(),
            sources: MemorySources::new(),
            artifacts: MemoryArtifactStore::new().with_base_url("https://files.example.org/public"),
        }
    }

    pub fn session(&self, options: SessionOptions) -> ArchiveSession<MemoryStorage> {
        ArchiveSession::new(self.storage.clone(), SessionKey::generate(), options)
    }

    pub fn tracker(&self) -> MemoryTracker {
        self.tracker_with(SessionOptions::new(), FinalizeOptions::new())
    }

    pub fn tracker_with(
        &self,
        session_options: SessionOptions,
        finalize_options: FinalizeOptions,
    ) -> MemoryTracker {
        BatchTracker::new(
            self.session(session_options),
            self.sources.clone(),
            Finalizer::new(self.artifacts.clone(), finalize_options),
        )
    }

    /// Registers source files named `names` with their name as content and
    /// returns matching entries.
    pub fn files(&self, names: &[&str]) -> Vec<ArchiveEntry> {
        names
            .iter()
            .map(|name| {
                let path = format!("/uploads/{name}");
                self.sources.insert(&path, name.as_bytes());
                ArchiveEntry::from_pair(path, name).expect("valid test name")
            })
            .collect()
    }

    /// Returns entries whose sources do not exist.
    pub fn missing(&self, names: &[&str]) -> Vec<ArchiveEntry> {
        names
            .iter()
            .map(|name| {
                ArchiveEntry::from_pair(format!("/gone/{name}"), name).expect("valid test name")
            })
            .collect()
    }
}

/// Returns the sorted entry names of a zip archive.
pub fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Reads one entry's contents from a zip archive.
pub fn zip_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip archive");
    let mut file = archive.by_name(name).expect("entry present");
    let mut data = Vec::new();
    file.read_to_end(&mut data).expect("readable entry");
    data
}
