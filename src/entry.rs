//! Archive entries and validated entry names.

use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Maximum length for entry names (in bytes).
///
/// The zip format stores names with a 16-bit length field.
const MAX_NAME_LENGTH: usize = u16::MAX as usize;

/// Windows reserved device names that cannot be used as filenames.
///
/// Rejected on all platforms so an artifact built anywhere can be unpacked
/// on Windows.
const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Checks if a filename is a Windows reserved name.
///
/// Reserved names are case-insensitive and also reserved when followed by an
/// extension (e.g., "CON.txt").
fn is_windows_reserved(name: &str) -> bool {
    let base = match name.find('.') {
        Some(pos) => &name[..pos],
        None => name,
    };

    WINDOWS_RESERVED_NAMES
        .iter()
        .any(|reserved| base.eq_ignore_ascii_case(reserved))
}

/// A validated name for a file stored inside the archive.
///
/// `EntryName` normalizes backslashes to forward slashes and validates that:
/// - No NUL bytes are present
/// - The name is not absolute (does not start with `/`)
/// - No empty segments exist (no `//` or trailing `/`)
/// - No `.` or `..` segments are present
///
/// # Examples
///
/// ```
/// use zipbatch::EntryName;
///
/// let name = EntryName::new("reports\\q3.pdf").unwrap();
/// assert_eq!(name.as_str(), "reports/q3.pdf");
///
/// assert!(EntryName::new("../secret").is_err());
/// assert!(EntryName::new("/etc/passwd").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryName(String);

impl EntryName {
    /// Creates a new `EntryName`, normalizing separators and validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryName`] if the name is empty, contains NUL
    /// bytes, is absolute, contains empty, `.` or `..` segments, or uses a
    /// Windows reserved device name.
    pub fn new(s: &str) -> Result<Self> {
        let normalized = s.replace('\\', "/");
        Self::validate(&normalized)?;
        Ok(Self(normalized))
    }

    /// Derives an entry name from the final component of a file path.
    pub fn from_file_name(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidEntryName(format!("no usable file name in {}", path.display()))
            })?;
        Self::new(name)
    }

    fn validate(s: &str) -> Result<()> {
        if s.contains('\0') {
            return Err(Error::InvalidEntryName("contains NUL byte".into()));
        }

        if s.is_empty() {
            return Err(Error::InvalidEntryName("empty name".into()));
        }

        if s.len() > MAX_NAME_LENGTH {
            return Err(Error::InvalidEntryName(format!(
                "name exceeds maximum length of {} bytes",
                MAX_NAME_LENGTH
            )));
        }

        if s.starts_with('/') {
            return Err(Error::InvalidEntryName("absolute path not allowed".into()));
        }

        if s.ends_with('/') {
            return Err(Error::InvalidEntryName("trailing slash not allowed".into()));
        }

        for segment in s.split('/') {
            if segment.is_empty() {
                return Err(Error::InvalidEntryName(
                    "empty segment (consecutive slashes)".into(),
                ));
            }
            if segment == "." {
                return Err(Error::InvalidEntryName("'.' segment not allowed".into()));
            }
            if segment == ".." {
                return Err(Error::InvalidEntryName(
                    "'..' segment not allowed (path traversal)".into(),
                ));
            }
            if is_windows_reserved(segment) {
                return Err(Error::InvalidEntryName(format!(
                    "Windows reserved filename '{}' not allowed",
                    segment
                )));
            }
        }

        Ok(())
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last segment of the name.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the name with `_<n>` inserted before the extension of the
    /// last segment.
    ///
    /// ```
    /// use zipbatch::EntryName;
    ///
    /// let name = EntryName::new("docs/report.tar.gz").unwrap();
    /// assert_eq!(name.with_suffix(0).unwrap().as_str(), "docs/report.tar_0.gz");
    ///
    /// let name = EntryName::new(".env").unwrap();
    /// assert_eq!(name.with_suffix(2).unwrap().as_str(), ".env_2");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryName`] if the suffixed name no longer
    /// fits the maximum name length.
    pub fn with_suffix(&self, n: usize) -> Result<Self> {
        let (dir, file) = match self.0.rfind('/') {
            Some(idx) => (&self.0[..=idx], &self.0[idx + 1..]),
            None => ("", self.0.as_str()),
        };
        let renamed = match file.rfind('.') {
            // A leading dot marks a hidden file, not an extension
            Some(dot) if dot > 0 => format!("{}{}_{}{}", dir, &file[..dot], n, &file[dot..]),
            _ => format!("{}{}_{}", dir, file, n),
        };
        Self::validate(&renamed)?;
        Ok(Self(renamed))
    }
}

impl AsRef<str> for EntryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for EntryName {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntryName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(&s)
    }
}

/// One file queued for inclusion in the archive.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveEntry {
    source_path: PathBuf,
    stored_name: EntryName,
}

impl ArchiveEntry {
    /// Creates an entry reading from `source_path`, stored as `stored_name`.
    pub fn new(source_path: impl Into<PathBuf>, stored_name: EntryName) -> Self {
        Self {
            source_path: source_path.into(),
            stored_name,
        }
    }

    /// Creates an entry from a source path and a display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryName`] if `display_name` is not a valid
    /// entry name.
    pub fn from_pair(source_path: impl Into<PathBuf>, display_name: &str) -> Result<Self> {
        Ok(Self::new(source_path, EntryName::new(display_name)?))
    }

    /// Creates an entry stored under the file name of its source path.
    pub fn from_path(source_path: impl Into<PathBuf>) -> Result<Self> {
        let source_path = source_path.into();
        let stored_name = EntryName::from_file_name(&source_path)?;
        Ok(Self {
            source_path,
            stored_name,
        })
    }

    /// Returns the source path.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the name used inside the archive.
    pub fn stored_name(&self) -> &EntryName {
        &self.stored_name
    }
}
