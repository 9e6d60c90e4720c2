//! Observer callbacks for batch archive operations.
//!
//! The observer is the side channel for per-entry events: every appended
//! entry and every skipped entry is reported individually as it happens,
//! independently of the aggregated [`AppendReport`] returned at the end of
//! the batch.
//!
//! # Example
//!
//! ```rust
//! use zipbatch::progress::{BatchObserver, skip_fn};
//!
//! let mut skipped = Vec::new();
//! let mut observer = skip_fn(|entry, _err| skipped.push(entry.stored_name().to_string()));
//! # let _ = &mut observer;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::entry::ArchiveEntry;
use crate::finalize::ArtifactReference;
use crate::session::AppendReport;
use crate::tracker::BatchState;
use crate::Error;

/// Callback trait for batch archive operations.
///
/// All methods have no-op defaults.
pub trait BatchObserver: Send {
    /// Called after an entry was written to the container.
    fn on_entry_appended(&mut self, stored_name: &str, bytes: u64) {
        let _ = (stored_name, bytes);
    }

    /// Called when an entry is skipped. `error` is the per-entry error, for
    /// missing sources an [`Error::EntryMissing`].
    fn on_entry_skipped(&mut self, entry: &ArchiveEntry, error: &Error) {
        let _ = (entry, error);
    }

    /// Called after a batch was appended and closed, with the updated state.
    fn on_batch_complete(&mut self, state: &BatchState, report: &AppendReport) {
        let _ = (state, report);
    }

    /// Called once the artifact has been persisted.
    fn on_finalized(&mut self, artifact: &ArtifactReference) {
        let _ = artifact;
    }
}

/// An observer that does nothing (null object pattern).
#[derive(Debug, Default, Clone)]
pub struct NoObserver;

impl BatchObserver for NoObserver {}

/// An observer that collects counts and skip messages.
#[derive(Debug, Default, Clone)]
pub struct StatisticsObserver {
    /// Entries appended across all batches.
    pub appended: u64,
    /// Bytes read from sources across all batches.
    pub bytes: u64,
    /// Messages for skipped entries, in order.
    pub skipped: Vec<String>,
    /// Number of completed batches.
    pub batches: u64,
    /// Location of the finalized artifact.
    pub artifact: Option<String>,
}

impl StatisticsObserver {
    /// Creates a new statistics observer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchObserver for StatisticsObserver {
    fn on_entry_appended(&mut self, _stored_name: &str, bytes: u64) {
        self.appended += 1;
        self.bytes += bytes;
    }

    fn on_entry_skipped(&mut self, _entry: &ArchiveEntry, error: &Error) {
        self.skipped.push(error.to_string());
    }

    fn on_batch_complete(&mut self, _state: &BatchState, _report: &AppendReport) {
        self.batches += 1;
    }

    fn on_finalized(&mut self, artifact: &ArtifactReference) {
        self.artifact = Some(artifact.location.clone());
    }
}

/// A thread-safe observer using atomics.
///
/// Allows progress to be monitored from another thread.
#[derive(Debug, Default)]
pub struct AtomicObserver {
    processed: AtomicU64,
    total: AtomicU64,
    appended: AtomicU64,
    skipped: AtomicU64,
}

impl AtomicObserver {
    /// Creates a shared atomic observer.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns items processed so far, as of the last completed batch.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Returns the total item count, as of the last completed batch.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Returns entries appended so far.
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    /// Returns entries skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Returns completion percentage (0.0 - 100.0).
    pub fn percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.processed() as f64 / total as f64) * 100.0
        }
    }
}

impl BatchObserver for Arc<AtomicObserver> {
    fn on_entry_appended(&mut self, _stored_name: &str, _bytes: u64) {
        self.appended.fetch_add(1, Ordering::Relaxed);
    }

    fn on_entry_skipped(&mut self, _entry: &ArchiveEntry, _error: &Error) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn on_batch_complete(&mut self, state: &BatchState, _report: &AppendReport) {
        self.processed.store(state.processed, Ordering::Relaxed);
        self.total.store(state.total, Ordering::Relaxed);
    }
}

/// Observer adapter for closures that only care about skipped entries.
pub struct SkipObserver<F> {
    callback: F,
}

impl<F> BatchObserver for SkipObserver<F>
where
    F: FnMut(&ArchiveEntry, &Error) + Send,
{
    fn on_entry_skipped(&mut self, entry: &ArchiveEntry, error: &Error) {
        (self.callback)(entry, error)
    }
}

/// Creates an observer from a skip callback.
pub fn skip_fn<F>(f: F) -> SkipObserver<F>
where
    F: FnMut(&ArchiveEntry, &Error) + Send,
{
    SkipObserver { callback: f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn missing(name: &str) -> (ArchiveEntry, Error) {
        let entry = ArchiveEntry::from_pair(format!("/src/{name}"), name).unwrap();
        let err = Error::EntryMissing {
            name: name.to_string(),
            path: PathBuf::from(format!("/src/{name}")),
        };
        (entry, err)
    }

    #[test]
    fn test_statistics_observer() {
        let mut observer = StatisticsObserver::new();
        observer.on_entry_appended("a.txt", 10);
        observer.on_entry_appended("b.txt", 5);
        let (entry, err) = missing("c.txt");
        observer.on_entry_skipped(&entry, &err);
        observer.on_batch_complete(&BatchState::new(3, 3), &AppendReport::default());

        assert_eq!(observer.appended, 2);
        assert_eq!(observer.bytes, 15);
        assert_eq!(observer.batches, 1);
        assert_eq!(observer.skipped.len(), 1);
        assert!(observer.skipped[0].contains("c.txt"));
    }

    #[test]
    fn test_atomic_observer() {
        let shared = AtomicObserver::shared();
        let mut reporter = Arc::clone(&shared);

        reporter.on_entry_appended("a", 1);
        let (entry, err) = missing("b");
        reporter.on_entry_skipped(&entry, &err);
        let mut state = BatchState::new(4, 2);
        state.processed = 2;
        reporter.on_batch_complete(&state, &AppendReport::default());

        assert_eq!(shared.appended(), 1);
        assert_eq!(shared.skipped(), 1);
        assert!((shared.percentage() - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_skip_fn() {
        let mut names = Vec::new();
        {
            let mut observer = skip_fn(|entry: &ArchiveEntry, _err: &Error| {
                names.push(entry.stored_name().to_string())
            });
            let (entry, err) = missing("gone.pdf");
            observer.on_entry_skipped(&entry, &err);
            observer.on_entry_appended("ignored", 1);
        }
        assert_eq!(names, vec!["gone.pdf".to_string()]);
    }
}
