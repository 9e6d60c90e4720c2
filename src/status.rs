//! User-facing completion messages.

use std::fmt;

use crate::finalize::ArtifactReference;

/// Message shown to the user once the artifact is ready.
///
/// ```
/// use std::time::SystemTime;
/// use zipbatch::storage::Lifetime;
/// use zipbatch::{ArtifactReference, StatusMessage};
///
/// let artifact = ArtifactReference {
///     location: "/srv/public/group-files-1.zip".into(),
///     file_name: "group-files-1.zip".into(),
///     size: 22,
///     entry_count: 0,
///     created: SystemTime::now(),
///     lifetime: Lifetime::Temporary,
///     url: Some("https://example.org/group-files-1.zip?a=1&b=2".into()),
/// };
/// let message = StatusMessage::download_ready(&artifact);
/// assert_eq!(
///     message.to_html(),
///     "Zip file created, <a href=\"https://example.org/group-files-1.zip?a=1&amp;b=2\" \
///      target=\"_blank\">Click here</a> to download."
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    link: String,
}

impl StatusMessage {
    /// Creates the download message for a finalized artifact.
    ///
    /// Links to the public URL, or to the location when there is none.
    pub fn download_ready(artifact: &ArtifactReference) -> Self {
        Self {
            link: artifact.link().to_string(),
        }
    }

    /// Returns the link target.
    pub fn link(&self) -> &str {
        &self.link
    }

    /// Renders the message as an HTML fragment.
    pub fn to_html(&self) -> String {
        format!(
            "Zip file created, <a href=\"{}\" target=\"_blank\">Click here</a> to download.",
            escape_html(&self.link)
        )
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Zip file created: {}", self.link)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
