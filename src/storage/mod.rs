//! Injected storage capabilities.
//!
//! A batch archive touches three kinds of storage, each behind its own
//! trait so the core can run against real disks or entirely in memory:
//!
//! - [`Storage`]: the scratch medium holding the in-progress container
//!   between batches (create, open, commit, read back, remove).
//! - [`SourceReader`]: where the files being archived are read from.
//! - [`ArtifactStore`]: durable storage for finished artifacts, with
//!   temporary-artifact expiry and public URL generation.
//!
//! Disk-backed implementations live in [`disk`], in-memory ones (with fault
//! injection for tests) in [`memory`].

use std::io::{self, Read, Seek, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

pub mod disk;
pub mod memory;

pub use disk::{DiskArtifactStore, DiskStorage, FsSources};
pub use memory::{MemoryArtifactStore, MemorySources, MemoryStorage};

/// Default maximum age of temporary artifacts before they expire.
pub const DEFAULT_TEMPORARY_MAX_AGE: Duration = Duration::from_secs(6 * 60 * 60);

/// Scratch medium for in-progress containers, keyed by session key.
pub trait Storage {
    /// Readable, writable, seekable handle to one container.
    type Container: Read + Write + Seek;

    /// Creates a fresh, empty container, replacing any existing one.
    fn create(&self, key: &str) -> io::Result<Self::Container>;

    /// Opens an existing container for appending, or `None` if absent.
    fn open(&self, key: &str) -> io::Result<Option<Self::Container>>;

    /// Flushes a container and makes its contents visible to later opens.
    ///
    /// Until a container is committed, reads and opens observe the
    /// previously committed contents.
    fn commit(&self, key: &str, container: Self::Container) -> io::Result<()>;

    /// Releases an uncommitted container, discarding its changes.
    fn abort(&self, key: &str) -> io::Result<()> {
        let _ = key;
        Ok(())
    }

    /// Reads back the committed bytes of a container.
    fn read(&self, key: &str) -> io::Result<Vec<u8>>;

    /// Removes a container. Removing an absent container is not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// An opened source file.
pub struct SourceFile {
    /// Stream of the file's contents.
    pub reader: Box<dyn Read>,
    /// Size in bytes, used to select large-file records.
    pub len: u64,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile").field("len", &self.len).finish()
    }
}

/// Opens source files for reading.
///
/// An [`io::ErrorKind::NotFound`] error marks the entry as missing; any other
/// error marks it unreadable.
pub trait SourceReader {
    /// Opens the file at `path`.
    fn open_source(&self, path: &Path) -> io::Result<SourceFile>;
}

/// How long a persisted artifact is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// Removed by [`ArtifactStore::expire_temporary`] once old enough.
    Temporary,
    /// Kept until removed explicitly.
    Permanent,
}

/// Receipt for an artifact written to an [`ArtifactStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Store-specific location (a filesystem path for disk stores).
    pub location: String,
    /// File name the artifact was stored under.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
    /// When the artifact was written.
    pub created: SystemTime,
}

/// Durable storage for finished artifacts.
pub trait ArtifactStore {
    /// Writes `data` under `name`, replacing any existing artifact with that
    /// name.
    fn persist(&self, name: &str, data: &[u8], lifetime: Lifetime) -> io::Result<StoredArtifact>;

    /// Returns a user-facing URL for the artifact, if the store is public.
    fn url_for(&self, artifact: &StoredArtifact) -> Option<String>;

    /// Removes temporary artifacts older than `max_age` as of `now` and
    /// returns their names.
    fn expire_temporary(&self, now: SystemTime, max_age: Duration) -> io::Result<Vec<String>>;
}

/// Acquires a mutex lock, recovering from poisoned state if necessary.
///
/// In-memory store contents are plain byte maps that stay consistent even if
/// a holder panicked mid-operation.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("In-memory store mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Percent-encodes one URL path segment (RFC 3986 unreserved set kept).
pub(crate) fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Joins a base URL and a file name.
pub(crate) fn join_url(base: &str, file_name: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        encode_path_segment(file_name)
    )
}
