//! Archive sessions: one growing zip container per bulk operation.
//!
//! A session is opened once per batch, appended to, and closed again. The
//! first successful close creates the container; every later open continues
//! it in append mode, so entries from earlier batches are never lost.
//!
//! # Example
//!
//! ```rust
//! use zipbatch::storage::{MemorySources, MemoryStorage};
//! use zipbatch::{ArchiveEntry, ArchiveSession, SessionKey, SessionOptions};
//!
//! # fn main() -> zipbatch::Result<()> {
//! let sources = MemorySources::new();
//! sources.insert("/in/a.txt", b"alpha");
//!
//! let mut session =
//!     ArchiveSession::new(MemoryStorage::new(), SessionKey::generate(), SessionOptions::new());
//!
//! let mut handle = session.open()?;
//! let report = handle.append(&sources, &[ArchiveEntry::from_path("/in/a.txt")?])?;
//! handle.close()?;
//! assert_eq!(report.appended_count(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use zip::{ZipArchive, ZipWriter};

use crate::entry::{ArchiveEntry, EntryName};
use crate::error::zip_to_io;
use crate::options::{DuplicatePolicy, SessionOptions};
use crate::progress::{BatchObserver, NoObserver};
use crate::storage::{SourceReader, Storage};
use crate::{Error, READ_BUFFER_SIZE, Result};

/// Maximum length of a session key.
const MAX_KEY_LENGTH: usize = 128;

/// Unique key of one bulk operation's scratch container.
///
/// Keys are per operation, never per user, so two bulk operations started
/// by the same person cannot write into each other's archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Generates a fresh random key of the form `batch-<uuid>`.
    pub fn generate() -> Self {
        Self(format!("batch-{}", uuid::Uuid::new_v4().simple()))
    }

    /// Creates a key from a caller-supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionKey`] unless the key is 1 to 128
    /// characters of `[A-Za-z0-9_-]`.
    pub fn new(key: &str) -> Result<Self> {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(Error::InvalidSessionKey(format!(
                "length must be 1-{} characters",
                MAX_KEY_LENGTH
            )));
        }
        if let Some(bad) = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(Error::InvalidSessionKey(format!(
                "character {:?} not allowed in '{}'",
                bad, key
            )));
        }
        Ok(Self(key.to_string()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns at most the last `n` characters of the key.
    pub fn suffix(&self, n: usize) -> &str {
        // Keys are ASCII, so byte offsets are character offsets
        &self.0[self.0.len().saturating_sub(n)..]
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an entry was left out of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The source path does not exist.
    Missing,
    /// The source could not be opened or read; carries the error message.
    Unreadable(String),
    /// The name is already taken and duplicates are skipped.
    Duplicate,
}

/// An entry that was not appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// The entry as submitted.
    pub entry: ArchiveEntry,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Outcome of appending one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendReport {
    /// Names written to the archive, in order.
    pub appended: Vec<String>,
    /// `(requested, stored)` pairs for entries renamed to avoid collisions.
    pub renamed: Vec<(String, String)>,
    /// Entries left out, in order.
    pub skipped: Vec<SkippedEntry>,
}

impl AppendReport {
    /// Returns the number of entries written.
    pub fn appended_count(&self) -> usize {
        self.appended.len()
    }

    /// Returns the requested names of skipped entries.
    pub fn skipped_names(&self) -> Vec<&str> {
        self.skipped
            .iter()
            .map(|s| s.entry.stored_name().as_str())
            .collect()
    }

    /// Returns true if every submitted entry was written.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Appends another report's contents to this one.
    pub fn merge(&mut self, other: AppendReport) {
        self.appended.extend(other.appended);
        self.renamed.extend(other.renamed);
        self.skipped.extend(other.skipped);
    }
}

/// One bulk operation's growing archive.
pub struct ArchiveSession<S: Storage> {
    storage: S,
    key: SessionKey,
    options: SessionOptions,
    /// Set once the first close has committed a container.
    committed: bool,
}

impl<S: Storage> ArchiveSession<S> {
    /// Creates a session. Nothing is written until the first close.
    pub fn new(storage: S, key: SessionKey, options: SessionOptions) -> Self {
        Self {
            storage,
            key,
            options,
            committed: false,
        }
    }

    /// Returns the session key.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Returns the scratch storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns true once at least one batch has been closed.
    pub fn has_committed(&self) -> bool {
        self.committed
    }

    /// Opens the container for one batch.
    ///
    /// The first open of a session creates a fresh, empty container; later
    /// opens continue the committed container in append mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the container cannot be
    /// created or opened, or the committed container is not a readable zip.
    pub fn open(&mut self) -> Result<ArchiveHandle<'_, S>> {
        let key = self.key.as_str();
        let mut existing = if self.committed {
            self.storage.open(key).map_err(|e| Error::storage(key, e))?
        } else {
            None
        };
        if let Some(container) = existing.as_mut() {
            if is_empty(container).map_err(|e| Error::storage(key, e))? {
                existing = None;
            }
        }

        let (writer, names) = match existing {
            Some(mut container) => {
                let reopened = existing_names(&mut container).and_then(|names| {
                    let writer = ZipWriter::new_append(container).map_err(zip_to_io)?;
                    Ok((writer, names))
                });
                match reopened {
                    Ok((writer, names)) => {
                        log::debug!("Reopened session {} with {} entries", key, names.len());
                        (writer, names)
                    }
                    Err(e) => {
                        if let Err(abort_err) = self.storage.abort(key) {
                            log::warn!("Failed to discard working container for {}: {}", key, abort_err);
                        }
                        return Err(Error::storage(key, e));
                    }
                }
            }
            None => {
                if self.committed {
                    log::warn!(
                        "Committed container for session {} is gone, starting a new one",
                        key
                    );
                }
                let container = self.storage.create(key).map_err(|e| Error::storage(key, e))?;
                log::debug!("Created container for session {}", key);
                (ZipWriter::new(container), HashSet::new())
            }
        };

        Ok(ArchiveHandle {
            session: self,
            writer,
            names,
        })
    }

    /// Runs one scoped open → append → close cycle.
    ///
    /// The handle is released on every exit path. When appending fails
    /// fatally, the uncommitted changes are discarded and the append error
    /// is returned; the container stays as of the last successful close.
    pub fn run_batch<R>(
        &mut self,
        sources: &R,
        entries: &[ArchiveEntry],
        observer: &mut dyn BatchObserver,
    ) -> Result<AppendReport>
    where
        R: SourceReader + ?Sized,
    {
        let mut handle = self.open()?;
        match handle.append_with(sources, entries, observer) {
            Ok(report) => {
                handle.close()?;
                Ok(report)
            }
            Err(e) => {
                handle.abandon();
                Err(e)
            }
        }
    }

    /// Reads back the committed container bytes.
    pub fn read_committed(&self) -> Result<Vec<u8>> {
        let key = self.key.as_str();
        self.storage.read(key).map_err(|e| Error::storage(key, e))
    }

    /// Removes the scratch container.
    pub fn discard(&mut self) -> Result<()> {
        let key = self.key.as_str();
        self.storage.remove(key).map_err(|e| Error::storage(key, e))?;
        self.committed = false;
        Ok(())
    }
}

fn is_empty<C: Seek>(container: &mut C) -> io::Result<bool> {
    let len = container.seek(SeekFrom::End(0))?;
    container.rewind()?;
    Ok(len == 0)
}

fn existing_names<C: Read + Seek>(container: &mut C) -> io::Result<HashSet<String>> {
    let archive = ZipArchive::new(&mut *container).map_err(zip_to_io)?;
    let names = archive.file_names().map(str::to_string).collect();
    drop(archive);
    container.rewind()?;
    Ok(names)
}

/// Exclusive handle to a session's open container.
///
/// Borrows the session mutably, so only one handle can exist at a time.
/// Call [`close`](Self::close) to commit the batch.
pub struct ArchiveHandle<'a, S: Storage> {
    session: &'a mut ArchiveSession<S>,
    writer: ZipWriter<S::Container>,
    names: HashSet<String>,
}

impl<S: Storage> ArchiveHandle<'_, S> {
    /// Returns the number of entries in the container so far.
    pub fn entry_count(&self) -> usize {
        self.names.len()
    }

    /// Returns true if `name` is already stored in the container.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Appends entries without an observer.
    pub fn append<R>(&mut self, sources: &R, entries: &[ArchiveEntry]) -> Result<AppendReport>
    where
        R: SourceReader + ?Sized,
    {
        self.append_with(sources, entries, &mut NoObserver)
    }

    /// Appends entries, reporting each one to `observer`.
    ///
    /// Missing or unreadable sources and skipped duplicates are reported and
    /// aggregated; they never stop the remaining entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if writing to the container
    /// fails.
    pub fn append_with<R>(
        &mut self,
        sources: &R,
        entries: &[ArchiveEntry],
        observer: &mut dyn BatchObserver,
    ) -> Result<AppendReport>
    where
        R: SourceReader + ?Sized,
    {
        let mut report = AppendReport::default();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        for entry in entries {
            let source = match sources.open_source(entry.source_path()) {
                Ok(source) => source,
                Err(e) => {
                    let reason = if e.kind() == io::ErrorKind::NotFound {
                        SkipReason::Missing
                    } else {
                        SkipReason::Unreadable(e.to_string())
                    };
                    skip(entry, reason, Some(e), observer, &mut report);
                    continue;
                }
            };

            let Some(name) = self.resolve_name(entry.stored_name()) else {
                skip(entry, SkipReason::Duplicate, None, observer, &mut report);
                continue;
            };

            let options = self.session.options.file_options(source.len);
            self.writer
                .start_file(name.as_str(), options)
                .map_err(|e| self.storage_error(zip_to_io(e)))?;

            let mut reader = source.reader;
            match self.copy_entry(&mut reader, &mut buf)? {
                Ok(bytes) => {
                    if name != *entry.stored_name() {
                        log::info!("Stored '{}' as '{}'", entry.stored_name(), name);
                        report
                            .renamed
                            .push((entry.stored_name().to_string(), name.to_string()));
                    }
                    observer.on_entry_appended(name.as_str(), bytes);
                    self.names.insert(name.to_string());
                    report.appended.push(name.to_string());
                }
                Err(read_err) => {
                    self.writer
                        .abort_file()
                        .map_err(|e| self.storage_error(zip_to_io(e)))?;
                    let reason = SkipReason::Unreadable(read_err.to_string());
                    skip(entry, reason, Some(read_err), observer, &mut report);
                }
            }
        }

        Ok(report)
    }

    /// Copies a source into the current zip record.
    ///
    /// The outer result carries fatal write errors, the inner one read
    /// errors that only affect this entry.
    fn copy_entry(
        &mut self,
        reader: &mut dyn Read,
        buf: &mut [u8],
    ) -> Result<io::Result<u64>> {
        let mut total = 0u64;
        loop {
            let n = match reader.read(buf) {
                Ok(0) => return Ok(Ok(total)),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Ok(Err(e)),
            };
            self.writer
                .write_all(&buf[..n])
                .map_err(|e| self.storage_error(e))?;
            total += n as u64;
        }
    }

    /// Picks the name an entry is stored under, or `None` to skip it.
    fn resolve_name(&self, requested: &EntryName) -> Option<EntryName> {
        if !self.names.contains(requested.as_str()) {
            return Some(requested.clone());
        }
        match self.session.options.duplicates {
            DuplicatePolicy::Skip => None,
            // Suffixes only grow, so the first one that does not fit ends the search
            DuplicatePolicy::Rename => (0..)
                .map_while(|n| requested.with_suffix(n).ok())
                .find(|candidate| !self.names.contains(candidate.as_str())),
        }
    }

    fn storage_error(&self, source: io::Error) -> Error {
        Error::storage(self.session.key.as_str(), source)
    }

    /// Finishes the container and commits it to storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the container cannot be
    /// finished or committed. The previously committed state is kept.
    pub fn close(self) -> Result<()> {
        let ArchiveHandle {
            session, writer, names,
        } = self;
        let key = session.key.as_str();

        let container = match writer.finish() {
            Ok(container) => container,
            Err(e) => {
                if let Err(abort_err) = session.storage.abort(key) {
                    log::warn!("Failed to discard working container for {}: {}", key, abort_err);
                }
                return Err(Error::storage(key, zip_to_io(e)));
            }
        };
        session
            .storage
            .commit(key, container)
            .map_err(|e| Error::storage(key, e))?;
        session.committed = true;
        log::debug!("Closed session {} with {} entries", key, names.len());
        Ok(())
    }

    /// Releases the handle without committing this batch's changes.
    pub fn abandon(self) {
        let ArchiveHandle {
            session, writer, ..
        } = self;
        drop(writer);
        let key = session.key.as_str();
        if let Err(e) = session.storage.abort(key) {
            log::warn!("Failed to discard working container for {}: {}", key, e);
        }
        log::debug!("Abandoned uncommitted changes for session {}", key);
    }
}

fn skip(
    entry: &ArchiveEntry,
    reason: SkipReason,
    source: Option<io::Error>,
    observer: &mut dyn BatchObserver,
    report: &mut AppendReport,
) {
    let name = entry.stored_name().to_string();
    let path = entry.source_path().to_path_buf();
    let error = match (&reason, source) {
        (SkipReason::Missing, _) => Error::EntryMissing { name, path },
        (SkipReason::Duplicate, _) => Error::DuplicateEntry { name },
        (SkipReason::Unreadable(_), Some(source)) => Error::EntryUnreadable { name, path, source },
        (SkipReason::Unreadable(msg), None) => Error::EntryUnreadable {
            name,
            path,
            source: io::Error::other(msg.clone()),
        },
    };
    log::warn!("{}", error);
    observer.on_entry_skipped(entry, &error);
    report.skipped.push(SkippedEntry {
        entry: entry.clone(),
        reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::StatisticsObserver;
    use crate::storage::{MemorySources, MemoryStorage};
    use std::io::Cursor;

    fn names_in(bytes: Vec<u8>) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    fn entry(path: &str, name: &str) -> ArchiveEntry {
        ArchiveEntry::from_pair(path, name).unwrap()
    }

    fn session(storage: &MemoryStorage) -> ArchiveSession<MemoryStorage> {
        ArchiveSession::new(
            storage.clone(),
            SessionKey::new("test-session").unwrap(),
            SessionOptions::new(),
        )
    }

    #[test]
    fn test_session_key_validation() {
        assert!(SessionKey::new("batch_01-a").is_ok());
        assert!(SessionKey::new("").is_err());
        assert!(SessionKey::new("../etc").is_err());
        assert!(SessionKey::new("user 1").is_err());
        assert!(SessionKey::new(&"k".repeat(129)).is_err());
    }

    #[test]
    fn test_generated_keys_are_unique_and_valid() {
        let a = SessionKey::generate();
        let b = SessionKey::generate();
        assert_ne!(a, b);
        assert!(SessionKey::new(a.as_str()).is_ok());
        assert_eq!(a.suffix(8).len(), 8);
        assert_eq!(SessionKey::new("ab").unwrap().suffix(8), "ab");
    }

    #[test]
    fn test_reopen_appends() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/a", b"1");
        sources.insert("/b", b"2");
        let mut session = session(&storage);

        let report = session
            .run_batch(&sources, &[entry("/a", "a.txt")], &mut NoObserver)
            .unwrap();
        assert_eq!(report.appended, vec!["a.txt"]);
        session
            .run_batch(&sources, &[entry("/b", "b.txt")], &mut NoObserver)
            .unwrap();

        assert_eq!(
            names_in(session.read_committed().unwrap()),
            vec!["a.txt", "b.txt"]
        );
    }

    #[test]
    fn test_first_open_replaces_stale_container() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/a", b"1");
        sources.insert("/b", b"2");

        let mut first = session(&storage);
        first
            .run_batch(&sources, &[entry("/a", "stale.txt")], &mut NoObserver)
            .unwrap();

        // Same key, new session: the first batch starts empty
        let mut second = session(&storage);
        second
            .run_batch(&sources, &[entry("/b", "fresh.txt")], &mut NoObserver)
            .unwrap();
        assert_eq!(names_in(second.read_committed().unwrap()), vec!["fresh.txt"]);
    }

    #[test]
    fn test_missing_source_does_not_abort_batch() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/a", b"1");
        sources.insert("/c", b"3");
        let mut session = session(&storage);
        let mut observer = StatisticsObserver::new();

        let report = session
            .run_batch(
                &sources,
                &[entry("/a", "a"), entry("/missing", "b"), entry("/c", "c")],
                &mut observer,
            )
            .unwrap();

        assert_eq!(report.appended_count(), 2);
        assert_eq!(report.skipped_names(), vec!["b"]);
        assert_eq!(report.skipped[0].reason, SkipReason::Missing);
        assert!(!report.is_complete());
        assert_eq!(observer.skipped.len(), 1);
        assert!(observer.skipped[0].contains("source not found"));
        assert_eq!(names_in(session.read_committed().unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn test_unreadable_source_is_aborted() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert_broken("/bad", 100);
        sources.insert("/ok", b"fine");
        let mut session = session(&storage);

        let report = session
            .run_batch(
                &sources,
                &[entry("/bad", "bad.bin"), entry("/ok", "ok.txt")],
                &mut NoObserver,
            )
            .unwrap();

        assert_eq!(report.appended, vec!["ok.txt"]);
        assert!(matches!(report.skipped[0].reason, SkipReason::Unreadable(_)));
        assert_eq!(names_in(session.read_committed().unwrap()), vec!["ok.txt"]);
    }

    #[test]
    fn test_duplicates_renamed_across_batches() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/1", b"one");
        sources.insert("/2", b"two");
        sources.insert("/3", b"three");
        let mut session = session(&storage);

        session
            .run_batch(&sources, &[entry("/1", "doc.pdf")], &mut NoObserver)
            .unwrap();
        let report = session
            .run_batch(
                &sources,
                &[entry("/2", "doc.pdf"), entry("/3", "doc.pdf")],
                &mut NoObserver,
            )
            .unwrap();

        assert_eq!(report.appended, vec!["doc_0.pdf", "doc_1.pdf"]);
        assert_eq!(report.renamed.len(), 2);
        assert_eq!(
            names_in(session.read_committed().unwrap()),
            vec!["doc.pdf", "doc_0.pdf", "doc_1.pdf"]
        );
    }

    #[test]
    fn test_duplicates_skipped_when_configured() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/1", b"one");
        sources.insert("/2", b"two");
        let mut session = ArchiveSession::new(
            storage.clone(),
            SessionKey::generate(),
            SessionOptions::new().duplicates(DuplicatePolicy::Skip),
        );

        let report = session
            .run_batch(
                &sources,
                &[entry("/1", "x.txt"), entry("/2", "x.txt")],
                &mut NoObserver,
            )
            .unwrap();
        assert_eq!(report.appended, vec!["x.txt"]);
        assert_eq!(report.skipped[0].reason, SkipReason::Duplicate);
    }

    #[test]
    fn test_duplicate_at_max_name_length_is_skipped() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/1", b"first");
        sources.insert("/2", b"second");
        sources.insert("/3", b"third");
        let mut session = session(&storage);

        let long = "a".repeat(u16::MAX as usize);
        let report = session
            .run_batch(
                &sources,
                &[entry("/1", &long), entry("/2", &long), entry("/3", "short.txt")],
                &mut NoObserver,
            )
            .unwrap();

        assert_eq!(report.appended, vec![long.clone(), "short.txt".to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::Duplicate);
        assert!(report.renamed.is_empty());
        assert_eq!(
            names_in(session.read_committed().unwrap()),
            vec![long, "short.txt".to_string()]
        );
    }

    #[test]
    fn test_storage_unavailable_keeps_committed_state() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/a", b"1");
        sources.insert("/b", b"2");
        let mut session = session(&storage);
        session
            .run_batch(&sources, &[entry("/a", "a")], &mut NoObserver)
            .unwrap();

        storage.set_unavailable(true);
        let err = session
            .run_batch(&sources, &[entry("/b", "b")], &mut NoObserver)
            .unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { .. }));

        storage.set_unavailable(false);
        session
            .run_batch(&sources, &[entry("/b", "b")], &mut NoObserver)
            .unwrap();
        assert_eq!(names_in(session.read_committed().unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_abandon_discards_batch() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/a", b"1");
        sources.insert("/b", b"2");
        let mut session = session(&storage);
        session
            .run_batch(&sources, &[entry("/a", "a")], &mut NoObserver)
            .unwrap();

        let mut handle = session.open().unwrap();
        assert_eq!(handle.entry_count(), 1);
        assert!(handle.contains("a"));
        handle.append(&sources, &[entry("/b", "b")]).unwrap();
        handle.abandon();

        assert_eq!(names_in(session.read_committed().unwrap()), vec!["a"]);
    }

    #[test]
    fn test_corrupt_container_is_storage_error() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/a", b"1");
        let mut session = session(&storage);
        session
            .run_batch(&sources, &[entry("/a", "a")], &mut NoObserver)
            .unwrap();

        let mut junk = storage.create("test-session").unwrap();
        junk.write_all(b"not a zip file at all").unwrap();
        storage.commit("test-session", junk).unwrap();

        let err = session.open().err().unwrap();
        assert!(matches!(err, Error::StorageUnavailable { .. }));
    }

    #[test]
    fn test_discard_removes_container() {
        let storage = MemoryStorage::new();
        let sources = MemorySources::new();
        sources.insert("/a", b"1");
        let mut session = session(&storage);
        session
            .run_batch(&sources, &[entry("/a", "a")], &mut NoObserver)
            .unwrap();
        assert!(storage.contains("test-session"));

        session.discard().unwrap();
        assert!(!storage.contains("test-session"));
        assert!(!session.has_committed());
    }
}
