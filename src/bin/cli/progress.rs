//! Progress bar for batch archive operations.

use indicatif::{ProgressBar, ProgressStyle};
use zipbatch::progress::BatchObserver;
use zipbatch::{ArchiveEntry, ArtifactReference, Error};

/// Progress display driven by tracker callbacks.
///
/// Cheap to clone; every clone updates the same bar.
#[derive(Clone)]
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Creates a new progress display for `total_entries` entries
    pub fn new(total_entries: u64, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(total_entries);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb
        };

        Self { bar }
    }

    /// Prints a line above the bar without disturbing it
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar.println(msg);
    }

    /// Finishes with a custom message
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.bar.finish_with_message(msg.into());
    }

    /// Clears the bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchObserver for CliProgress {
    fn on_entry_appended(&mut self, stored_name: &str, _bytes: u64) {
        // Truncate long names
        let len = stored_name.chars().count();
        let display_name = if len > 40 {
            let tail: String = stored_name.chars().skip(len - 37).collect();
            format!("...{}", tail)
        } else {
            stored_name.to_string()
        };
        self.bar.set_message(display_name);
        self.bar.inc(1);
    }

    fn on_entry_skipped(&mut self, _entry: &ArchiveEntry, error: &Error) {
        self.println(format!("Warning: {}", error));
        self.bar.inc(1);
    }

    fn on_finalized(&mut self, artifact: &ArtifactReference) {
        self.bar.set_message(artifact.file_name.clone());
    }
}
