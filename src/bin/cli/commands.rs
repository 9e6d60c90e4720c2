//! Command implementations for the CLI tool.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

use zipbatch::storage::{ArtifactStore, DiskArtifactStore, DiskStorage, FsSources};
use zipbatch::{
    AppendReport, ArchiveEntry, ArchiveSession, BatchState, BatchTracker, Compression, Error,
    FinalizeOptions, Finalizer, HttpFetcher, RemoteImporter, SessionKey, SessionOptions,
};

use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::progress::CliProgress;
use crate::{DuplicateMode, OutputFormat};

/// How many times finalization is retried after a persist failure.
const FINALIZE_RETRIES: u32 = 3;

/// Configuration for the zip command.
pub struct ZipConfig<'a> {
    pub inputs: &'a [PathBuf],
    pub batch_size: u64,
    pub scratch_dir: Option<&'a Path>,
    pub public_dir: &'a Path,
    pub base_url: Option<String>,
    pub name_prefix: String,
    pub keep_scratch: bool,
    pub duplicates: DuplicateMode,
    pub store_only: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Zip command implementation
pub fn zip(config: &ZipConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let entries = match collect_entries(config.inputs) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::BadArgs;
        }
    };
    if entries.is_empty() {
        eprintln!("Error: No files to add to archive");
        return ExitCode::BadArgs;
    }

    let storage = match config.scratch_dir {
        Some(dir) => DiskStorage::new(dir),
        None => DiskStorage::in_temp_dir(),
    };
    let mut session_options = SessionOptions::new().duplicates(config.duplicates.into());
    if config.store_only {
        session_options = session_options.compression(Compression::Stored);
    }
    let session = ArchiveSession::new(storage, SessionKey::generate(), session_options);

    let mut artifacts = DiskArtifactStore::new(config.public_dir);
    if let Some(base_url) = &config.base_url {
        artifacts = artifacts.with_base_url(base_url.as_str());
    }
    let finalizer = Finalizer::new(
        artifacts,
        FinalizeOptions::new()
            .name_prefix(config.name_prefix.as_str())
            .keep_scratch(config.keep_scratch),
    );

    let progress = CliProgress::new(entries.len() as u64, config.quiet);
    let mut tracker =
        BatchTracker::new(session, FsSources, finalizer).with_observer(progress.clone());

    let batch_size = match config.batch_size {
        0 => entries.len(),
        n => n as usize,
    };
    let mut state = BatchState::new(entries.len() as u64, config.batch_size);
    let mut report = AppendReport::default();
    let mut artifact = None;

    for batch in entries.chunks(batch_size) {
        match tracker.on_batch(state, batch) {
            Ok(outcome) => {
                state = outcome.state;
                report.merge(outcome.report);
                artifact = outcome.artifact;
            }
            Err(e @ Error::PersistFailure { .. }) => {
                if let Some(last) = tracker.last_report() {
                    report.merge(last.clone());
                }
                progress.println(format!("Warning: {}", e));
                match retry_finalize(&mut tracker) {
                    Ok(a) => artifact = Some(a),
                    Err(e) => {
                        progress.finish_with_message("Failed");
                        eprintln!("Error: {}", e);
                        return error_to_exit_code(&e);
                    }
                }
            }
            Err(e) => {
                progress.finish_with_message("Failed");
                eprintln!("Error: {}", e);
                return error_to_exit_code(&e);
            }
        }
    }

    progress.finish();

    let Some(artifact) = artifact else {
        eprintln!("Error: archive was not finalized");
        return ExitCode::FatalError;
    };

    print!("{}", formatter.format_zip_result(&artifact, &report));

    if report.is_complete() {
        ExitCode::Success
    } else {
        ExitCode::Warning
    }
}

fn retry_finalize<S, R, A>(
    tracker: &mut BatchTracker<S, R, A>,
) -> zipbatch::Result<zipbatch::ArtifactReference>
where
    S: zipbatch::storage::Storage,
    R: zipbatch::storage::SourceReader,
    A: ArtifactStore,
{
    let mut attempt = 1;
    loop {
        match tracker.finalize() {
            Err(e) if e.is_retryable() && attempt < FINALIZE_RETRIES => {
                log::warn!("Finalize attempt {} failed: {}", attempt, e);
                std::thread::sleep(Duration::from_millis(200 * u64::from(attempt)));
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Expands inputs into archive entries.
///
/// Directories are walked recursively and their files stored under paths
/// relative to the directory. Paths that do not exist are kept so they show
/// up in the skip list.
fn collect_entries(inputs: &[PathBuf]) -> zipbatch::Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();

    for path in inputs {
        if !path.is_dir() {
            entries.push(ArchiveEntry::from_path(path)?);
            continue;
        }

        for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("{}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let rel_path = entry
                .path()
                .strip_prefix(path)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            match ArchiveEntry::from_pair(entry.path(), &rel_path) {
                Ok(archive_entry) => entries.push(archive_entry),
                Err(e) => log::warn!("Ignoring {}: {}", entry.path().display(), e),
            }
        }
    }

    Ok(entries)
}

/// Fetch command implementation
pub fn fetch(
    url: &str,
    public_dir: &Path,
    base_url: Option<String>,
    format: OutputFormat,
) -> ExitCode {
    let formatter = create_formatter(format);

    let fetcher = match HttpFetcher::new() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error creating HTTP client: {}", e);
            return ExitCode::FatalError;
        }
    };
    let mut artifacts = DiskArtifactStore::new(public_dir);
    if let Some(base_url) = base_url {
        artifacts = artifacts.with_base_url(base_url);
    }

    match RemoteImporter::new(fetcher, artifacts).import(url) {
        Ok(artifact) => {
            print!("{}", formatter.format_import_result(&artifact));
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            error_to_exit_code(&e)
        }
    }
}

/// Expire command implementation
pub fn expire(public_dir: &Path, max_age: Duration, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);
    let artifacts = DiskArtifactStore::new(public_dir);

    match artifacts.expire_temporary(SystemTime::now(), max_age) {
        Ok(removed) => {
            print!("{}", formatter.format_expire_result(&removed));
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error expiring artifacts in {}: {}", public_dir.display(), e);
            ExitCode::IoError
        }
    }
}
