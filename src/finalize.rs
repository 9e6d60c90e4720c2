//! Turning a completed scratch container into a durable artifact.

use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use zip::ZipArchive;

use crate::error::zip_to_io;
use crate::options::FinalizeOptions;
use crate::session::{ArchiveSession, SessionKey};
use crate::storage::{ArtifactStore, Lifetime, Storage};
use crate::{Error, Result};

/// Number of session key characters included in artifact names.
const KEY_SUFFIX_LEN: usize = 8;

/// Reference to a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    /// Store-specific location of the artifact.
    pub location: String,
    /// File name the artifact was stored under.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
    /// Number of entries in the archive.
    pub entry_count: usize,
    /// When the artifact was written.
    pub created: SystemTime,
    /// Whether the artifact expires.
    pub lifetime: Lifetime,
    /// Public download URL, if the store has one.
    pub url: Option<String>,
}

impl ArtifactReference {
    /// Returns the URL if present, otherwise the location.
    pub fn link(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.location)
    }
}

/// Builds the artifact file name for a session finalized at `now`.
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use zipbatch::{SessionKey, finalize::artifact_name};
///
/// let key = SessionKey::new("batch-0123456789abcdef").unwrap();
/// let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
/// assert_eq!(
///     artifact_name("group-files-", &key, now),
///     "group-files-1700000000-89abcdef.zip"
/// );
/// ```
pub fn artifact_name(prefix: &str, key: &SessionKey, now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}{}-{}.zip", prefix, secs, key.suffix(KEY_SUFFIX_LEN))
}

/// Persists completed archives to an [`ArtifactStore`].
#[derive(Debug)]
pub struct Finalizer<A: ArtifactStore> {
    artifacts: A,
    options: FinalizeOptions,
}

impl<A: ArtifactStore> Finalizer<A> {
    /// Creates a finalizer writing to `artifacts`.
    pub fn new(artifacts: A, options: FinalizeOptions) -> Self {
        Self { artifacts, options }
    }

    /// Returns the artifact store.
    pub fn artifacts(&self) -> &A {
        &self.artifacts
    }

    /// Persists the session's committed container as an artifact.
    ///
    /// The scratch container is removed afterwards unless
    /// [`FinalizeOptions::keep_scratch`] is set. If persisting fails the
    /// scratch container is left as it is, so the call can be repeated.
    ///
    /// # Errors
    ///
    /// - [`Error::StorageUnavailable`] if the container cannot be read back
    ///   or is not a valid archive.
    /// - [`Error::PersistFailure`] if the artifact cannot be written.
    pub fn finalize<S: Storage>(&self, session: &mut ArchiveSession<S>) -> Result<ArtifactReference> {
        let bytes = session.read_committed()?;
        let entry_count = ZipArchive::new(Cursor::new(bytes.as_slice()))
            .map_err(|e| Error::storage(session.key().as_str(), zip_to_io(e)))?
            .len();

        let name = artifact_name(&self.options.name_prefix, session.key(), SystemTime::now());
        let stored = self
            .artifacts
            .persist(&name, &bytes, self.options.lifetime)
            .map_err(|e| {
                log::error!("Failed to persist artifact {}: {}", name, e);
                Error::persist(name.as_str(), e)
            })?;
        let url = self.artifacts.url_for(&stored);

        log::info!(
            "Finalized session {} as {} ({} entries, {} bytes)",
            session.key(),
            stored.location,
            entry_count,
            stored.size
        );

        if !self.options.keep_scratch {
            if let Err(e) = session.discard() {
                log::warn!("Artifact persisted but scratch cleanup failed: {}", e);
            }
        }

        Ok(ArtifactReference {
            location: stored.location,
            file_name: stored.file_name,
            size: stored.size,
            entry_count,
            created: stored.created,
            lifetime: self.options.lifetime,
            url,
        })
    }
}
