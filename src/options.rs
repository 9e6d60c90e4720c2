//! Configuration for archive sessions and finalization.
//!
//! Options are plain builder structs passed at construction time:
//!
//! ```rust
//! use zipbatch::{DuplicatePolicy, FinalizeOptions, SessionOptions};
//!
//! let session = SessionOptions::new().duplicates(DuplicatePolicy::Skip);
//! let finalize = FinalizeOptions::new()
//!     .name_prefix("exports-")
//!     .keep_scratch(true);
//! ```

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::storage::Lifetime;

/// Sources at or above this size are written with zip64 records.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

/// Default artifact name prefix.
pub const DEFAULT_NAME_PREFIX: &str = "group-files-";

/// Compression applied to archived entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Compression {
    /// No compression.
    Stored,
    /// Deflate compression.
    #[cfg(feature = "deflate")]
    Deflated,
}

impl Default for Compression {
    fn default() -> Self {
        #[cfg(feature = "deflate")]
        {
            Compression::Deflated
        }
        #[cfg(not(feature = "deflate"))]
        {
            Compression::Stored
        }
    }
}

impl From<Compression> for CompressionMethod {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::Stored => CompressionMethod::Stored,
            #[cfg(feature = "deflate")]
            Compression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// What to do when an entry's name is already present in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Store under `stem_<n>.ext`, using the first free `n` from 0.
    #[default]
    Rename,
    /// Skip the entry and report it.
    Skip,
}

/// Options for an [`ArchiveSession`](crate::ArchiveSession).
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub(crate) compression: Compression,
    pub(crate) duplicates: DuplicatePolicy,
    pub(crate) large_file_threshold: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            duplicates: DuplicatePolicy::default(),
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

impl SessionOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression method.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the duplicate name policy.
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Sets the source size at which zip64 records are used.
    pub fn large_file_threshold(mut self, bytes: u64) -> Self {
        self.large_file_threshold = bytes;
        self
    }

    /// Returns the duplicate name policy.
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    /// Builds zip file options for a source of `len` bytes.
    pub(crate) fn file_options(&self, len: u64) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(self.compression.into())
            .unix_permissions(0o644)
            .large_file(len >= self.large_file_threshold)
    }
}

/// Options for a [`Finalizer`](crate::Finalizer).
#[derive(Debug, Clone)]
pub struct FinalizeOptions {
    pub(crate) name_prefix: String,
    pub(crate) keep_scratch: bool,
    pub(crate) lifetime: Lifetime,
}

impl Default for FinalizeOptions {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            keep_scratch: false,
            lifetime: Lifetime::Temporary,
        }
    }
}

impl FinalizeOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the artifact name prefix.
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Keeps the scratch container after a successful finalization.
    pub fn keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    /// Sets the artifact lifetime. Defaults to [`Lifetime::Temporary`].
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }
}
