//! Batch tracking and the finalization decision.
//!
//! The orchestrator hands the tracker one batch at a time together with the
//! current [`BatchState`]. The tracker appends the batch through its session,
//! advances the counters, and on the final batch finalizes the archive. It is
//! the only place where that decision is made.
//!
//! # Example
//!
//! ```rust
//! use zipbatch::storage::{MemoryArtifactStore, MemorySources, MemoryStorage};
//! use zipbatch::{
//!     ArchiveEntry, ArchiveSession, BatchState, BatchTracker, FinalizeOptions, Finalizer,
//!     SessionKey, SessionOptions,
//! };
//!
//! # fn main() -> zipbatch::Result<()> {
//! let sources = MemorySources::new();
//! sources.insert("/in/a.txt", b"a");
//! sources.insert("/in/b.txt", b"b");
//!
//! let session =
//!     ArchiveSession::new(MemoryStorage::new(), SessionKey::generate(), SessionOptions::new());
//! let finalizer = Finalizer::new(MemoryArtifactStore::new(), FinalizeOptions::new());
//! let mut tracker = BatchTracker::new(session, sources, finalizer);
//!
//! let state = BatchState::new(2, 1);
//! let first = tracker.on_batch(state, &[ArchiveEntry::from_path("/in/a.txt")?])?;
//! assert!(!first.is_final);
//!
//! let second = tracker.on_batch(first.state, &[ArchiveEntry::from_path("/in/b.txt")?])?;
//! assert!(second.is_final);
//! assert_eq!(second.artifact.map(|a| a.entry_count), Some(2));
//! # Ok(())
//! # }
//! ```

use crate::entry::ArchiveEntry;
use crate::finalize::{ArtifactReference, Finalizer};
use crate::progress::{BatchObserver, NoObserver};
use crate::session::{AppendReport, ArchiveSession};
use crate::storage::{ArtifactStore, SourceReader, Storage};
use crate::{Error, Result};

/// Progress counters of a bulk operation.
///
/// Passed in with every batch and returned updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchState {
    /// Items handled by earlier batches.
    pub processed: u64,
    /// Total items in the bulk operation.
    pub total: u64,
    /// Nominal items per batch; zero means "the size of each batch".
    pub batch_size: u64,
}

impl BatchState {
    /// Creates the state for a new bulk operation.
    pub fn new(total: u64, batch_size: u64) -> Self {
        Self {
            processed: 0,
            total,
            batch_size,
        }
    }

    /// Returns the number of items not yet processed.
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.processed)
    }

    /// Returns true if a batch of `batch_items` items starting at this state
    /// is the final one.
    pub fn is_final_batch(&self, batch_items: u64) -> bool {
        let effective = if self.batch_size == 0 {
            batch_items
        } else {
            self.batch_size
        };
        self.processed.saturating_add(effective) >= self.total
    }

    /// Validates the counters and returns the state after `batch_items`
    /// more items.
    fn advance(self, batch_items: u64) -> Result<Self> {
        let invalid = || Error::InvalidBatchState {
            processed: self.processed,
            total: self.total,
            batch_items,
        };
        let processed = self.processed.checked_add(batch_items).ok_or_else(invalid)?;
        if processed > self.total {
            return Err(invalid());
        }
        Ok(Self { processed, ..self })
    }
}

/// Result of one [`BatchTracker::on_batch`] call.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Counters after this batch.
    pub state: BatchState,
    /// What happened to this batch's entries.
    pub report: AppendReport,
    /// True if this was the final batch.
    pub is_final: bool,
    /// The persisted artifact, present only on the final batch.
    pub artifact: Option<ArtifactReference>,
}

impl BatchOutcome {
    /// Returns the number of entries appended by this batch.
    pub fn appended_count(&self) -> usize {
        self.report.appended_count()
    }
}

#[derive(Debug)]
enum Phase {
    Collecting,
    AwaitingFinalize,
    Finalized(ArtifactReference),
}

/// Drives an [`ArchiveSession`] batch by batch and finalizes it once.
pub struct BatchTracker<S: Storage, R: SourceReader, A: ArtifactStore> {
    session: ArchiveSession<S>,
    sources: R,
    finalizer: Finalizer<A>,
    observer: Box<dyn BatchObserver>,
    state: Option<BatchState>,
    last_report: Option<AppendReport>,
    phase: Phase,
}

impl<S, R, A> BatchTracker<S, R, A>
where
    S: Storage,
    R: SourceReader,
    A: ArtifactStore,
{
    /// Creates a tracker for one bulk operation.
    pub fn new(session: ArchiveSession<S>, sources: R, finalizer: Finalizer<A>) -> Self {
        Self {
            session,
            sources,
            finalizer,
            observer: Box::new(NoObserver),
            state: None,
            last_report: None,
            phase: Phase::Collecting,
        }
    }

    /// Sets the observer notified of entries, batches, and finalization.
    pub fn with_observer(mut self, observer: impl BatchObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Processes one batch.
    ///
    /// Appends `entries`, advances `state.processed` by `entries.len()`, and
    /// on the final batch persists the artifact. Whether a batch is final is
    /// decided from the counters as passed in:
    /// `processed + batch_size >= total`, where a `batch_size` of zero
    /// stands for `entries.len()`.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionComplete`] if the final batch was already processed.
    /// - [`Error::InvalidBatchState`] if the counters are inconsistent.
    /// - [`Error::StorageUnavailable`] if the batch could not be appended; the
    ///   state is not advanced and the batch can be resubmitted.
    /// - [`Error::PersistFailure`] if the final batch was appended but the
    ///   artifact could not be written. Retry with [`finalize`](Self::finalize).
    pub fn on_batch(&mut self, state: BatchState, entries: &[ArchiveEntry]) -> Result<BatchOutcome> {
        if !matches!(self.phase, Phase::Collecting) {
            return Err(Error::SessionComplete);
        }
        let batch_items = entries.len() as u64;
        let next = state.advance(batch_items)?;
        let is_final = state.is_final_batch(batch_items);

        let report = if entries.is_empty() && self.session.has_committed() {
            AppendReport::default()
        } else {
            self.session
                .run_batch(&self.sources, entries, self.observer.as_mut())?
        };

        log::debug!(
            "Batch done for session {}: {}/{} processed, {} appended, {} skipped",
            self.session.key(),
            next.processed,
            next.total,
            report.appended_count(),
            report.skipped.len()
        );
        self.observer.on_batch_complete(&next, &report);
        self.state = Some(next);
        self.last_report = Some(report.clone());

        let artifact = if is_final {
            self.phase = Phase::AwaitingFinalize;
            Some(self.finalize()?)
        } else {
            None
        };

        Ok(BatchOutcome {
            state: next,
            report,
            is_final,
            artifact,
        })
    }

    /// Finalizes the archive, or returns the artifact of an earlier success.
    ///
    /// Only needed to retry after [`on_batch`](Self::on_batch) returned a
    /// persist failure; no batch is appended again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFinal`] before the final batch, and the
    /// finalizer's error if persisting fails again.
    pub fn finalize(&mut self) -> Result<ArtifactReference> {
        match &self.phase {
            Phase::Collecting => Err(Error::NotFinal),
            Phase::Finalized(artifact) => Ok(artifact.clone()),
            Phase::AwaitingFinalize => {
                let artifact = self.finalizer.finalize(&mut self.session)?;
                self.observer.on_finalized(&artifact);
                self.phase = Phase::Finalized(artifact.clone());
                Ok(artifact)
            }
        }
    }

    /// Returns the counters after the last processed batch.
    pub fn state(&self) -> Option<BatchState> {
        self.state
    }

    /// Returns the report of the last processed batch.
    pub fn last_report(&self) -> Option<&AppendReport> {
        self.last_report.as_ref()
    }

    /// Returns true once the artifact has been persisted.
    pub fn is_finalized(&self) -> bool {
        matches!(self.phase, Phase::Finalized(_))
    }

    /// Returns the underlying session.
    pub fn session(&self) -> &ArchiveSession<S> {
        &self.session
    }

    /// Returns the artifact store.
    pub fn artifacts(&self) -> &A {
        self.finalizer.artifacts()
    }
}
