//! Error types for batch archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when building an archive across batches, along with a
//! convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! Errors fall into three groups that callers usually treat differently:
//!
//! | Group | Variants | Caller action |
//! |-------|----------|---------------|
//! | Batch-fatal | [`StorageUnavailable`][Error::StorageUnavailable] | Abort or retry the whole batch |
//! | Per-entry | [`EntryMissing`][Error::EntryMissing] | Reported, batch continues |
//! | Retryable | [`PersistFailure`][Error::PersistFailure] | Call `finalize()` again |
//!
//! ```rust
//! use zipbatch::Error;
//!
//! fn describe(error: &Error) -> &'static str {
//!     if error.is_per_entry() {
//!         "skipped"
//!     } else if error.is_retryable() {
//!         "try again"
//!     } else {
//!         "failed"
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// The main error type for batch archive operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error outside the scratch and artifact storage paths.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The scratch container could not be opened, created, parsed, or written.
    ///
    /// Fatal for the current batch. The session keeps the state produced by
    /// its last successful close.
    #[error("Storage unavailable for session '{key}': {source}")]
    StorageUnavailable {
        /// Session key of the container.
        key: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A queued entry's source file does not exist.
    ///
    /// Never returned from a batch call; delivered to observers and
    /// aggregated into the batch's skip list.
    #[error("Entry '{name}' skipped: source not found at {}", path.display())]
    EntryMissing {
        /// Name the entry would have had inside the archive.
        name: String,
        /// Source path that was looked up.
        path: PathBuf,
    },

    /// A queued entry's source exists but could not be read to the end.
    ///
    /// Reported like [`EntryMissing`][Error::EntryMissing]; the partially
    /// written record is removed from the container.
    #[error("Entry '{name}' skipped: failed to read {}: {source}", path.display())]
    EntryUnreadable {
        /// Name the entry would have had inside the archive.
        name: String,
        /// Source path that failed.
        path: PathBuf,
        /// Underlying read failure.
        #[source]
        source: io::Error,
    },

    /// A queued entry's name is already taken inside the archive and the
    /// session is configured to skip duplicates.
    #[error("Entry '{name}' skipped: name already present in archive")]
    DuplicateEntry {
        /// The colliding name.
        name: String,
    },

    /// The finished archive could not be written to artifact storage.
    ///
    /// The scratch container is left untouched, so finalization can be
    /// retried without reprocessing any batch.
    #[error("Failed to persist artifact '{name}': {source}")]
    PersistFailure {
        /// Artifact file name that was being written.
        name: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// An archive entry name failed validation.
    #[error("Invalid entry name: {0}")]
    InvalidEntryName(String),

    /// A session key contains characters that are not safe as a storage key.
    #[error("Invalid session key: {0}")]
    InvalidSessionKey(String),

    /// Batch counters are inconsistent.
    #[error(
        "Invalid batch state: processed {processed} + {batch_items} items exceeds total {total}"
    )]
    InvalidBatchState {
        /// Items processed before this batch.
        processed: u64,
        /// Total items in the bulk operation.
        total: u64,
        /// Items submitted in this batch.
        batch_items: u64,
    },

    /// A batch was submitted after the final batch had already been processed.
    #[error("Bulk operation already reached its final batch")]
    SessionComplete,

    /// Finalization was requested before the final batch.
    #[error("Bulk operation has not reached its final batch")]
    NotFinal,

    /// A remote URL could not be turned into a file name.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A remote resource could not be fetched.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed {
        /// The requested URL.
        url: String,
        /// Human-readable failure description.
        reason: String,
    },
}

impl Error {
    /// Returns true if the failed operation can be retried as-is without
    /// redoing earlier work.
    ///
    /// Persist failures are always retryable. Storage errors are retryable
    /// when the underlying I/O error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::PersistFailure { .. } => true,
            Error::FetchFailed { .. } => true,
            Error::StorageUnavailable { source, .. } | Error::Io(source) => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns true for errors scoped to a single entry, which never abort a
    /// batch.
    pub fn is_per_entry(&self) -> bool {
        matches!(
            self,
            Error::EntryMissing { .. } | Error::EntryUnreadable { .. } | Error::DuplicateEntry { .. }
        )
    }

    /// Returns the entry name associated with this error, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::EntryMissing { name, .. }
            | Error::EntryUnreadable { name, .. }
            | Error::DuplicateEntry { name } => Some(name),
            _ => None,
        }
    }

    pub(crate) fn storage(key: impl Into<String>, source: io::Error) -> Self {
        Error::StorageUnavailable {
            key: key.into(),
            source,
        }
    }

    pub(crate) fn persist(name: impl Into<String>, source: io::Error) -> Self {
        Error::PersistFailure {
            name: name.into(),
            source,
        }
    }
}

/// Converts a zip container error into an I/O error so it can be carried by
/// the storage-level variants.
pub(crate) fn zip_to_io(err: zip::result::ZipError) -> io::Error {
    match err {
        zip::result::ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// A specialized Result type for batch archive operations.
pub type Result<T> = std::result::Result<T, Error>;
