//! # zipbatch
//!
//! Build one zip archive from a large set of files across many short batches.
//!
//! Bulk operations in request-driven systems usually run in slices: a few
//! items per request, with control handed back to an orchestrator between
//! slices. This crate keeps a single scratch container growing across those
//! slices, reports files that could not be archived without aborting the
//! batch, and on the last batch persists the result as a downloadable
//! artifact exactly once.
//!
//! ## Quick Start
//!
//! ```rust
//! use zipbatch::storage::{MemoryArtifactStore, MemorySources, MemoryStorage};
//! use zipbatch::{
//!     ArchiveEntry, ArchiveSession, BatchState, BatchTracker, FinalizeOptions, Finalizer,
//!     SessionKey, SessionOptions, StatusMessage,
//! };
//!
//! fn main() -> zipbatch::Result<()> {
//!     let sources = MemorySources::new();
//!     for name in ["a.txt", "b.txt", "c.txt"] {
//!         sources.insert(format!("/data/{name}"), name.as_bytes());
//!     }
//!
//!     let session =
//!         ArchiveSession::new(MemoryStorage::new(), SessionKey::generate(), SessionOptions::new());
//!     let artifacts = MemoryArtifactStore::new().with_base_url("https://example.org/files");
//!     let finalizer = Finalizer::new(artifacts, FinalizeOptions::new());
//!     let mut tracker = BatchTracker::new(session, sources, finalizer);
//!
//!     // Three items, two per batch
//!     let mut state = BatchState::new(3, 2);
//!     let batches = [
//!         vec![ArchiveEntry::from_path("/data/a.txt")?, ArchiveEntry::from_path("/data/b.txt")?],
//!         vec![ArchiveEntry::from_path("/data/c.txt")?],
//!     ];
//!     for batch in &batches {
//!         let outcome = tracker.on_batch(state, batch)?;
//!         state = outcome.state;
//!         if let Some(artifact) = outcome.artifact {
//!             assert_eq!(artifact.entry_count, 3);
//!             println!("{}", StatusMessage::download_ready(&artifact));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Storage
//!
//! All filesystem access goes through three traits in [`storage`]:
//! [`Storage`](storage::Storage) for the scratch container,
//! [`SourceReader`](storage::SourceReader) for input files, and
//! [`ArtifactStore`](storage::ArtifactStore) for finished artifacts. Disk and
//! in-memory implementations are provided.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. Per-entry problems such as a missing
//! source never fail a batch; they are delivered to the
//! [`BatchObserver`](progress::BatchObserver) and listed in the batch's
//! [`AppendReport`].
//!
//! ```rust
//! use zipbatch::Error;
//!
//! fn handle(result: zipbatch::Result<()>) {
//!     match result {
//!         Ok(()) => {}
//!         Err(e @ Error::PersistFailure { .. }) => eprintln!("retry finalize: {e}"),
//!         Err(e @ Error::StorageUnavailable { .. }) => eprintln!("batch failed: {e}"),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! # handle(Ok(()));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `deflate` | Yes | Deflate compression for entries |
//! | `remote` | No | HTTP fetcher for remote imports |
//! | `cli` | No | Command-line interface tool |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Default buffer size for read operations (64 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 64 * 1024;

pub mod entry;
pub mod error;
pub mod finalize;
pub mod options;
pub mod progress;
pub mod remote;
pub mod session;
pub mod status;
pub mod storage;
pub mod tracker;

pub use entry::{ArchiveEntry, EntryName};
pub use error::{Error, Result};
pub use finalize::{ArtifactReference, Finalizer};
pub use options::{Compression, DuplicatePolicy, FinalizeOptions, SessionOptions};
pub use session::{AppendReport, ArchiveHandle, ArchiveSession, SessionKey, SkipReason, SkippedEntry};
pub use status::StatusMessage;
pub use tracker::{BatchOutcome, BatchState, BatchTracker};

// Re-export progress API
pub use progress::{AtomicObserver, BatchObserver, NoObserver, StatisticsObserver, skip_fn};

// Re-export remote import API
pub use remote::{Fetch, RemoteImporter};

#[cfg(feature = "remote")]
#[cfg_attr(docsrs, doc(cfg(feature = "remote")))]
pub use remote::HttpFetcher;
