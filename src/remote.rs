//! Importing remote files into the artifact store.
//!
//! A remote file is fetched in full and stored permanently under the last
//! segment of its URL, replacing any artifact with the same name.

use std::io;

use crate::finalize::ArtifactReference;
use crate::storage::{ArtifactStore, Lifetime};
use crate::{Error, Result};

/// Downloads the body of a URL.
pub trait Fetch {
    /// Returns the full response body for `url`.
    fn fetch(&self, url: &str) -> io::Result<Vec<u8>>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &str) -> io::Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

/// Derives the stored file name from a URL.
///
/// The query string and fragment are ignored; the name is the last path
/// segment.
///
/// ```
/// use zipbatch::remote::file_name_from_url;
///
/// assert_eq!(
///     file_name_from_url("https://cdn.example.org/media/clip.mp4?sig=abc#t=10").unwrap(),
///     "clip.mp4"
/// );
/// assert!(file_name_from_url("https://cdn.example.org/").is_err());
/// ```
pub fn file_name_from_url(url: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidUrl(format!("{}: {}", reason, url));

    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme"))?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
        return Err(invalid("bad scheme"));
    }

    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let path = match rest[..end].split_once('/') {
        Some((_, path)) => path,
        None => return Err(invalid("no path")),
    };
    let name = path.rsplit('/').next().unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." {
        return Err(invalid("no file name"));
    }
    if name.contains(['\\', '\0']) {
        return Err(invalid("unsafe file name"));
    }
    Ok(name.to_string())
}

/// Fetches remote files and stores them as permanent artifacts.
#[derive(Debug)]
pub struct RemoteImporter<F: Fetch, A: ArtifactStore> {
    fetcher: F,
    artifacts: A,
}

impl<F: Fetch, A: ArtifactStore> RemoteImporter<F, A> {
    /// Creates an importer.
    pub fn new(fetcher: F, artifacts: A) -> Self {
        Self { fetcher, artifacts }
    }

    /// Fetches `url` and stores it under its file name.
    ///
    /// The returned reference has an `entry_count` of zero; the file is
    /// stored as fetched and never inspected.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if no file name can be derived from `url`.
    /// - [`Error::FetchFailed`] if the download fails or the body is empty.
    /// - [`Error::PersistFailure`] if the file cannot be stored.
    pub fn import(&self, url: &str) -> Result<ArtifactReference> {
        let name = file_name_from_url(url)?;

        let data = self.fetcher.fetch(url).map_err(|e| Error::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if data.is_empty() {
            return Err(Error::FetchFailed {
                url: url.to_string(),
                reason: "empty response body".into(),
            });
        }

        let stored = self
            .artifacts
            .persist(&name, &data, Lifetime::Permanent)
            .map_err(|e| {
                log::error!("Failed to store {} from {}: {}", name, url, e);
                Error::persist(name.as_str(), e)
            })?;
        log::info!("Imported {} as {} ({} bytes)", url, stored.location, stored.size);

        let url = self.artifacts.url_for(&stored);
        Ok(ArtifactReference {
            location: stored.location,
            file_name: stored.file_name,
            size: stored.size,
            entry_count: 0,
            created: stored.created,
            lifetime: Lifetime::Permanent,
            url,
        })
    }
}

#[cfg(feature = "remote")]
pub use http::HttpFetcher;

#[cfg(feature = "remote")]
mod http {
    use std::io;
    use std::time::Duration;

    use super::Fetch;

    /// Default request timeout.
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// [`Fetch`] over HTTP(S) using a blocking reqwest client.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: reqwest::blocking::Client,
    }

    impl HttpFetcher {
        /// Creates a fetcher with the default timeout.
        pub fn new() -> io::Result<Self> {
            Self::with_timeout(DEFAULT_TIMEOUT)
        }

        /// Creates a fetcher with a custom request timeout.
        pub fn with_timeout(timeout: Duration) -> io::Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .user_agent(concat!("zipbatch/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .map_err(io::Error::other)?;
            Ok(Self { client })
        }
    }

    impl Fetch for HttpFetcher {
        fn fetch(&self, url: &str) -> io::Result<Vec<u8>> {
            let response = self.client.get(url).send().map_err(|e| {
                if e.is_timeout() {
                    io::Error::new(io::ErrorKind::TimedOut, e)
                } else {
                    io::Error::other(e)
                }
            })?;
            let status = response.status();
            if !status.is_success() {
                return Err(io::Error::other(format!("HTTP {}", status)));
            }
            let body = response.bytes().map_err(io::Error::other)?;
            Ok(body.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryArtifactStore;
    use std::collections::HashMap;

    struct StaticFetcher(HashMap<&'static str, &'static [u8]>);

    impl Fetch for StaticFetcher {
        fn fetch(&self, url: &str) -> io::Result<Vec<u8>> {
            self.0
                .get(url)
                .map(|body| body.to_vec())
                .ok_or_else(|| io::Error::other("HTTP 404 Not Found"))
        }
    }

    fn fetcher() -> StaticFetcher {
        let mut bodies: HashMap<&'static str, &'static [u8]> = HashMap::new();
        bodies.insert("https://cdn.example/a/logo.png?v=2", b"PNG");
        bodies.insert("https://cdn.example/b/logo.png", b"PNG2");
        bodies.insert("https://cdn.example/empty.txt", b"");
        StaticFetcher(bodies)
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url("http://h/a/b/c.pdf").unwrap(), "c.pdf");
        assert_eq!(file_name_from_url("https://h/x.txt#frag").unwrap(), "x.txt");
        assert_eq!(file_name_from_url("https://h/p/q?x=/y.zip").unwrap(), "q");
        for bad in ["no-scheme/file.txt", "https://host", "https://host/dir/", "://h/a", "https://h/.."] {
            assert!(
                matches!(file_name_from_url(bad), Err(Error::InvalidUrl(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_import_stores_permanent_and_replaces() {
        let store = MemoryArtifactStore::new().with_base_url("/files");
        let importer = RemoteImporter::new(fetcher(), store.clone());

        let first = importer.import("https://cdn.example/a/logo.png?v=2").unwrap();
        assert_eq!(first.file_name, "logo.png");
        assert_eq!(first.lifetime, Lifetime::Permanent);
        assert_eq!(first.url.as_deref(), Some("/files/logo.png"));
        assert_eq!(store.lifetime_of("logo.png"), Some(Lifetime::Permanent));

        importer.import("https://cdn.example/b/logo.png").unwrap();
        assert_eq!(store.get("logo.png").unwrap(), b"PNG2");
        assert_eq!(store.names(), vec!["logo.png".to_string()]);
    }

    #[test]
    fn test_import_errors() {
        let store = MemoryArtifactStore::new();
        let importer = RemoteImporter::new(fetcher(), store.clone());

        let err = importer.import("https://cdn.example/missing.bin").unwrap_err();
        assert!(matches!(err, Error::FetchFailed { .. }));
        assert!(err.to_string().contains("404"));

        let err = importer.import("https://cdn.example/empty.txt").unwrap_err();
        assert!(matches!(err, Error::FetchFailed { .. }));

        store.fail_next_writes(1);
        let err = importer.import("https://cdn.example/b/logo.png").unwrap_err();
        assert!(matches!(err, Error::PersistFailure { .. }));
        assert!(store.names().is_empty());
    }
}
