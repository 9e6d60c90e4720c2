//! Exit codes for the CLI tool.

use zipbatch::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Archive created, but some entries were skipped
pub const WARNING: i32 = 1;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Scratch storage could not be used
pub const STORAGE_ERROR: i32 = 3;
/// Artifact could not be persisted
pub const PERSIST_ERROR: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Remote resource could not be fetched
pub const FETCH_ERROR: i32 = 6;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Warning,
    FatalError,
    StorageError,
    PersistError,
    IoError,
    FetchError,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::Warning => WARNING,
            Self::FatalError => FATAL_ERROR,
            Self::StorageError => STORAGE_ERROR,
            Self::PersistError => PERSIST_ERROR,
            Self::IoError => IO_ERROR,
            Self::FetchError => FETCH_ERROR,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts a zipbatch error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        Error::StorageUnavailable { .. } => ExitCode::StorageError,
        Error::PersistFailure { .. } => ExitCode::PersistError,
        Error::FetchFailed { .. } => ExitCode::FetchError,
        Error::InvalidUrl(_) | Error::InvalidEntryName(_) | Error::InvalidSessionKey(_) => {
            ExitCode::BadArgs
        }
        Error::EntryMissing { .. } | Error::EntryUnreadable { .. } | Error::DuplicateEntry { .. } => {
            ExitCode::Warning
        }
        // Tracker misuse and future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
