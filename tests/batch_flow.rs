//! End-to-end batch flows against in-memory storage.

use zipbatch::BatchObserver;
use zipbatch::progress::StatisticsObserver;
use zipbatch::{
    BatchState, DuplicatePolicy, Error, FinalizeOptions, SessionOptions, SkipReason, StatusMessage,
};

mod common;

use common::{Fixture, zip_entry, zip_names};

// =============================================================================
// Finalization decision
// =============================================================================

#[test]
fn test_ten_items_two_batches_with_missing_sources() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker();

    let first = fx.files(&["1.pdf", "2.pdf", "3.pdf", "4.pdf", "5.pdf"]);
    let outcome = tracker.on_batch(BatchState::new(10, 5), &first).unwrap();
    assert!(!outcome.is_final);
    assert!(outcome.artifact.is_none());
    assert_eq!(outcome.appended_count(), 5);
    assert_eq!(outcome.state.processed, 5);

    let mut second = fx.files(&["6.pdf", "7.pdf", "8.pdf"]);
    second.extend(fx.missing(&["9.pdf", "10.pdf"]));
    let outcome = tracker.on_batch(outcome.state, &second).unwrap();
    assert!(outcome.is_final);
    assert_eq!(outcome.state.processed, 10);
    assert_eq!(outcome.report.skipped_names(), vec!["9.pdf", "10.pdf"]);
    assert!(
        outcome
            .report
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::Missing)
    );

    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact.entry_count, 8);
    let bytes = fx.artifacts.get(&artifact.file_name).unwrap();
    assert_eq!(zip_names(&bytes).len(), 8);
    assert_eq!(zip_entry(&bytes, "7.pdf"), b"7.pdf");
}

#[test]
fn test_all_missing_final_batch_still_finalizes() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker();

    let outcome = tracker
        .on_batch(BatchState::new(2, 2), &fx.missing(&["a", "b"]))
        .unwrap();
    assert!(outcome.is_final);
    assert_eq!(outcome.report.skipped.len(), 2);
    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact.entry_count, 0);
    assert!(zip_names(&fx.artifacts.get(&artifact.file_name).unwrap()).is_empty());
}

#[test]
fn test_nominal_batch_size_decides_final() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker();

    // Orchestrator reports a nominal batch size larger than what remains
    let outcome = tracker
        .on_batch(BatchState::new(3, 3), &fx.files(&["a", "b"]))
        .unwrap();
    assert!(outcome.is_final);
    assert_eq!(outcome.artifact.unwrap().entry_count, 2);
}

#[test]
fn test_zero_batch_size_uses_batch_length() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker();

    let outcome = tracker
        .on_batch(BatchState::new(3, 0), &fx.files(&["a", "b"]))
        .unwrap();
    assert!(!outcome.is_final);
    let outcome = tracker.on_batch(outcome.state, &fx.files(&["c"])).unwrap();
    assert!(outcome.is_final);
    assert_eq!(outcome.artifact.unwrap().entry_count, 3);
}

#[test]
fn test_batch_after_final_is_rejected() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker();

    let outcome = tracker.on_batch(BatchState::new(1, 1), &fx.files(&["a"])).unwrap();
    assert!(tracker.is_finalized());
    let err = tracker.on_batch(outcome.state, &fx.files(&["b"])).unwrap_err();
    assert!(matches!(err, Error::SessionComplete));
    assert_eq!(fx.artifacts.names().len(), 1);
}

// =============================================================================
// Persist failures and retry
// =============================================================================

#[test]
fn test_persist_failure_then_finalize_alone() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker();

    let outcome = tracker
        .on_batch(BatchState::new(4, 2), &fx.files(&["a", "b"]))
        .unwrap();

    fx.artifacts.fail_next_writes(2);
    let err = tracker.on_batch(outcome.state, &fx.files(&["c", "d"])).unwrap_err();
    assert!(matches!(err, Error::PersistFailure { .. }));
    assert!(err.is_retryable());

    // Scratch container survives and is still a complete archive
    let scratch = tracker.session().read_committed().unwrap();
    assert_eq!(zip_names(&scratch), vec!["a", "b", "c", "d"]);

    assert!(matches!(tracker.finalize(), Err(Error::PersistFailure { .. })));
    let artifact = tracker.finalize().unwrap();
    assert_eq!(artifact.entry_count, 4);
    assert!(tracker.is_finalized());
    assert_eq!(fx.artifacts.names(), vec![artifact.file_name.clone()]);
}

#[test]
fn test_storage_failure_keeps_batch_resubmittable() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker();

    let outcome = tracker
        .on_batch(BatchState::new(4, 2), &fx.files(&["a", "b"]))
        .unwrap();

    fx.storage.set_unavailable(true);
    let second = fx.files(&["c", "d"]);
    let err = tracker.on_batch(outcome.state, &second).unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable { .. }));
    assert_eq!(tracker.state().unwrap().processed, 2);

    fx.storage.set_unavailable(false);
    let outcome = tracker.on_batch(outcome.state, &second).unwrap();
    assert_eq!(outcome.artifact.unwrap().entry_count, 4);
}

// =============================================================================
// Names, observers, status message
// =============================================================================

#[test]
fn test_duplicate_names_across_batches() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker();

    let first = fx.files(&["scan.pdf"]);
    let outcome = tracker.on_batch(BatchState::new(2, 1), &first).unwrap();

    fx.sources.insert("/other/scan.pdf", b"second scan");
    let second = vec![zipbatch::ArchiveEntry::from_path("/other/scan.pdf").unwrap()];
    let outcome = tracker.on_batch(outcome.state, &second).unwrap();

    assert_eq!(
        outcome.report.renamed,
        vec![("scan.pdf".to_string(), "scan_0.pdf".to_string())]
    );
    let bytes = fx.artifacts.get(&outcome.artifact.unwrap().file_name).unwrap();
    assert_eq!(zip_names(&bytes), vec!["scan.pdf", "scan_0.pdf"]);
    assert_eq!(zip_entry(&bytes, "scan_0.pdf"), b"second scan");
}

#[test]
fn test_duplicate_skip_policy() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker_with(
        SessionOptions::new().duplicates(DuplicatePolicy::Skip),
        FinalizeOptions::new(),
    );

    let mut batch = fx.files(&["a.txt"]);
    fx.sources.insert("/elsewhere/a.txt", b"other");
    batch.push(zipbatch::ArchiveEntry::from_path("/elsewhere/a.txt").unwrap());

    let outcome = tracker.on_batch(BatchState::new(2, 2), &batch).unwrap();
    assert_eq!(outcome.report.skipped[0].reason, SkipReason::Duplicate);
    assert_eq!(outcome.artifact.unwrap().entry_count, 1);
}

#[test]
fn test_statistics_observer_over_whole_operation() {
    let fx = Fixture::new();
    let observer = StatisticsObserver::new();
    let shared = std::sync::Arc::new(std::sync::Mutex::new(observer));

    struct Forward(std::sync::Arc<std::sync::Mutex<StatisticsObserver>>);
    impl BatchObserver for Forward {
        fn on_entry_appended(&mut self, name: &str, bytes: u64) {
            self.0.lock().unwrap().on_entry_appended(name, bytes);
        }
        fn on_entry_skipped(&mut self, entry: &zipbatch::ArchiveEntry, error: &Error) {
            self.0.lock().unwrap().on_entry_skipped(entry, error);
        }
        fn on_batch_complete(&mut self, state: &BatchState, report: &zipbatch::AppendReport) {
            self.0.lock().unwrap().on_batch_complete(state, report);
        }
        fn on_finalized(&mut self, artifact: &zipbatch::ArtifactReference) {
            self.0.lock().unwrap().on_finalized(artifact);
        }
    }

    let mut tracker = fx.tracker().with_observer(Forward(shared.clone()));
    let outcome = tracker
        .on_batch(BatchState::new(3, 2), &fx.files(&["ab", "cd"]))
        .unwrap();
    let outcome = tracker.on_batch(outcome.state, &fx.missing(&["ef"])).unwrap();

    let stats = shared.lock().unwrap();
    assert_eq!(stats.appended, 2);
    assert_eq!(stats.bytes, 4);
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.skipped.len(), 1);
    assert_eq!(stats.artifact, outcome.artifact.map(|a| a.location));
}

#[test]
fn test_status_message_links_artifact() {
    let fx = Fixture::new();
    let mut tracker = fx.tracker_with(
        SessionOptions::new(),
        FinalizeOptions::new().name_prefix("export-"),
    );

    let outcome = tracker.on_batch(BatchState::new(1, 1), &fx.files(&["a"])).unwrap();
    let artifact = outcome.artifact.unwrap();
    assert!(artifact.file_name.starts_with("export-"));

    let message = StatusMessage::download_ready(&artifact);
    let expected_url = format!("https://files.example.org/public/{}", artifact.file_name);
    assert_eq!(message.link(), expected_url);
    assert_eq!(
        message.to_html(),
        format!(
            "Zip file created, <a href=\"{}\" target=\"_blank\">Click here</a> to download.",
            expected_url
        )
    );
}
