//! In-memory storage with fault injection.
//!
//! Every type here is a cheap handle around shared state: clones observe and
//! mutate the same contents, so a test can keep one clone for inspection
//! and fault injection while the session owns another.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use super::{
    ArtifactStore, Lifetime, SourceFile, SourceReader, Storage, StoredArtifact, join_url,
    lock_or_recover,
};

#[derive(Debug, Default)]
struct ContainerMap {
    containers: HashMap<String, Vec<u8>>,
    unavailable: bool,
}

/// Scratch containers held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<ContainerMap>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent create/open/commit fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock_or_recover(&self.inner).unavailable = unavailable;
    }

    /// Returns true if a committed container exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        lock_or_recover(&self.inner).containers.contains_key(key)
    }

    fn check_available(map: &ContainerMap) -> io::Result<()> {
        if map.unavailable {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "scratch storage is unavailable",
            ))
        } else {
            Ok(())
        }
    }
}

impl Storage for MemoryStorage {
    type Container = Cursor<Vec<u8>>;

    fn create(&self, _key: &str) -> io::Result<Self::Container> {
        Self::check_available(&lock_or_recover(&self.inner))?;
        Ok(Cursor::new(Vec::new()))
    }

    fn open(&self, key: &str) -> io::Result<Option<Self::Container>> {
        let map = lock_or_recover(&self.inner);
        Self::check_available(&map)?;
        Ok(map.containers.get(key).map(|bytes| Cursor::new(bytes.clone())))
    }

    fn commit(&self, key: &str, container: Self::Container) -> io::Result<()> {
        let mut map = lock_or_recover(&self.inner);
        Self::check_available(&map)?;
        map.containers.insert(key.to_string(), container.into_inner());
        Ok(())
    }

    fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        lock_or_recover(&self.inner)
            .containers
            .get(key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no container '{key}'")))
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        lock_or_recover(&self.inner).containers.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum SourceData {
    Bytes(Arc<[u8]>),
    /// Opens fine, then fails after yielding `good` bytes.
    Broken { good: usize },
}

/// Source files held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    files: Arc<Mutex<HashMap<PathBuf, SourceData>>>,
}

impl MemorySources {
    /// Creates an empty source set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a source file.
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl AsRef<[u8]>) {
        lock_or_recover(&self.files)
            .insert(path.into(), SourceData::Bytes(Arc::from(data.as_ref())));
    }

    /// Adds a source that can be opened but fails partway through reading.
    pub fn insert_broken(&self, path: impl Into<PathBuf>, good: usize) {
        lock_or_recover(&self.files).insert(path.into(), SourceData::Broken { good });
    }

    /// Removes a source file.
    pub fn remove(&self, path: &Path) {
        lock_or_recover(&self.files).remove(path);
    }
}

/// Reader that yields zeros and then fails.
struct BrokenReader {
    remaining: usize,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("simulated read failure"));
        }
        let n = buf.len().min(self.remaining);
        buf[..n].fill(0);
        self.remaining -= n;
        Ok(n)
    }
}

impl SourceReader for MemorySources {
    fn open_source(&self, path: &Path) -> io::Result<SourceFile> {
        let data = lock_or_recover(&self.files).get(path).cloned();
        match data {
            Some(SourceData::Bytes(bytes)) => Ok(SourceFile {
                len: bytes.len() as u64,
                reader: Box::new(Cursor::new(bytes)),
            }),
            Some(SourceData::Broken { good }) => Ok(SourceFile {
                len: good as u64 + 1,
                reader: Box::new(BrokenReader { remaining: good }),
            }),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryArtifact {
    data: Vec<u8>,
    lifetime: Lifetime,
    created: SystemTime,
}

#[derive(Debug, Default)]
struct ArtifactMap {
    artifacts: HashMap<String, MemoryArtifact>,
    failures_remaining: usize,
}

/// Artifact store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    inner: Arc<Mutex<ArtifactMap>>,
    base_url: Option<String>,
}

impl MemoryArtifactStore {
    /// Creates an empty store with no public URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the public base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Makes the next `count` persist calls fail.
    pub fn fail_next_writes(&self, count: usize) {
        lock_or_recover(&self.inner).failures_remaining = count;
    }

    /// Returns the bytes stored under `name`.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        lock_or_recover(&self.inner)
            .artifacts
            .get(name)
            .map(|a| a.data.clone())
    }

    /// Returns the lifetime of the artifact stored under `name`.
    pub fn lifetime_of(&self, name: &str) -> Option<Lifetime> {
        lock_or_recover(&self.inner)
            .artifacts
            .get(name)
            .map(|a| a.lifetime)
    }

    /// Overrides the creation time of an artifact.
    pub fn set_created(&self, name: &str, created: SystemTime) {
        if let Some(artifact) = lock_or_recover(&self.inner).artifacts.get_mut(name) {
            artifact.created = created;
        }
    }

    /// Returns the names of all stored artifacts, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = lock_or_recover(&self.inner)
            .artifacts
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn persist(&self, name: &str, data: &[u8], lifetime: Lifetime) -> io::Result<StoredArtifact> {
        let mut map = lock_or_recover(&self.inner);
        if map.failures_remaining > 0 {
            map.failures_remaining -= 1;
            return Err(io::Error::other("simulated artifact write failure"));
        }
        let created = SystemTime::now();
        map.artifacts.insert(
            name.to_string(),
            MemoryArtifact {
                data: data.to_vec(),
                lifetime,
                created,
            },
        );
        Ok(StoredArtifact {
            location: format!("memory://{}", name),
            file_name: name.to_string(),
            size: data.len() as u64,
            created,
        })
    }

    fn url_for(&self, artifact: &StoredArtifact) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|base| join_url(base, &artifact.file_name))
    }

    fn expire_temporary(&self, now: SystemTime, max_age: Duration) -> io::Result<Vec<String>> {
        let mut map = lock_or_recover(&self.inner);
        let mut removed: Vec<String> = map
            .artifacts
            .iter()
            .filter(|(_, a)| {
                a.lifetime == Lifetime::Temporary
                    && now.duration_since(a.created).unwrap_or_default() > max_age
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in &removed {
            map.artifacts.remove(name);
        }
        removed.sort();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_storage_commit_and_reopen() {
        let storage = MemoryStorage::new();
        assert!(storage.open("k").unwrap().is_none());

        let mut c = storage.create("k").unwrap();
        c.write_all(b"abc").unwrap();
        storage.commit("k", c).unwrap();

        let c = storage.open("k").unwrap().unwrap();
        assert_eq!(c.position(), 0);
        assert_eq!(storage.read("k").unwrap(), b"abc");
    }

    #[test]
    fn test_memory_storage_unavailable() {
        let storage = MemoryStorage::new();
        let shared = storage.clone();
        shared.set_unavailable(true);
        assert_eq!(
            storage.create("k").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        shared.set_unavailable(false);
        assert!(storage.create("k").is_ok());
    }

    #[test]
    fn test_memory_sources() {
        let sources = MemorySources::new();
        sources.insert("/a", b"xyz");
        let mut file = sources.open_source(Path::new("/a")).unwrap();
        let mut buf = Vec::new();
        file.reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"xyz");

        sources.remove(Path::new("/a"));
        let err = sources.open_source(Path::new("/a")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_broken_source_fails_midway() {
        let sources = MemorySources::new();
        sources.insert_broken("/bad", 4);
        let mut file = sources.open_source(Path::new("/bad")).unwrap();
        let mut buf = Vec::new();
        let err = file.reader.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_artifact_store_fault_injection() {
        let store = MemoryArtifactStore::new();
        store.fail_next_writes(1);
        assert!(store.persist("a.zip", b"1", Lifetime::Temporary).is_err());
        let stored = store.persist("a.zip", b"1", Lifetime::Temporary).unwrap();
        assert_eq!(stored.location, "memory://a.zip");
        assert_eq!(store.get("a.zip").unwrap(), b"1");
    }

    #[test]
    fn test_artifact_store_expiry() {
        let store = MemoryArtifactStore::new();
        store.persist("t.zip", b"1", Lifetime::Temporary).unwrap();
        store.persist("p.bin", b"2", Lifetime::Permanent).unwrap();
        store.persist("new.zip", b"3", Lifetime::Temporary).unwrap();

        let now = SystemTime::now();
        let old = now - Duration::from_secs(3600);
        store.set_created("t.zip", old);
        store.set_created("p.bin", old);

        let removed = store
            .expire_temporary(now, Duration::from_secs(60))
            .unwrap();
        assert_eq!(removed, vec!["t.zip".to_string()]);
        assert_eq!(store.names(), vec!["new.zip".to_string(), "p.bin".to_string()]);
    }
}
