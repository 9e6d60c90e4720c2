//! Filesystem-backed storage.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::NamedTempFile;

use super::{
    ArtifactStore, Lifetime, SourceFile, SourceReader, Storage, StoredArtifact, join_url,
};

/// Name of the lifetime manifest kept inside an artifact directory.
const MANIFEST_NAME: &str = ".artifacts.json";

/// Scratch containers stored as `<dir>/<key>.zip`.
///
/// Opened containers are working copies (`<key>.zip.part`); commit renames
/// the copy over the committed file, so an aborted batch leaves the last
/// committed archive intact.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    dir: PathBuf,
}

impl DiskStorage {
    /// Creates a scratch storage rooted at `dir`. The directory is created
    /// lazily on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Scratch storage under the system temporary directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Returns the path of the committed container for `key`.
    pub fn container_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.zip", key))
    }

    fn working_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.zip.part", key))
    }

    fn open_working(&self, key: &str) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.working_path(key))
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl Storage for DiskStorage {
    type Container = File;

    fn create(&self, key: &str) -> io::Result<File> {
        fs::create_dir_all(&self.dir)?;
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.working_path(key))
    }

    fn open(&self, key: &str) -> io::Result<Option<File>> {
        match fs::copy(self.container_path(key), self.working_path(key)) {
            Ok(_) => self.open_working(key).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn commit(&self, key: &str, mut container: File) -> io::Result<()> {
        container.flush()?;
        container.sync_all()?;
        drop(container);
        fs::rename(self.working_path(key), self.container_path(key))
    }

    fn abort(&self, key: &str) -> io::Result<()> {
        remove_if_exists(&self.working_path(key))
    }

    fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.container_path(key))
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        remove_if_exists(&self.working_path(key))?;
        remove_if_exists(&self.container_path(key))
    }
}

/// Reads source files straight from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSources;

impl SourceReader for FsSources {
    fn open_source(&self, path: &Path) -> io::Result<SourceFile> {
        let file = File::open(path)?;
        let meta = file.metadata()?;
        if meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            ));
        }
        Ok(SourceFile {
            len: meta.len(),
            reader: Box::new(io::BufReader::new(file)),
        })
    }
}

/// Artifacts stored as plain files in a public directory.
///
/// Artifact lifetimes are tracked in a JSON manifest next to the files.
/// Ages for expiry come from file modification times. The manifest is not
/// locked across processes; run one expiry pass at a time per directory.
#[derive(Debug, Clone)]
pub struct DiskArtifactStore {
    root: PathBuf,
    base_url: Option<String>,
}

impl DiskArtifactStore {
    /// Creates a store rooted at `root` with no public URL.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: None,
        }
    }

    /// Sets the public base URL under which `root` is served.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the lifetime recorded for `name`, if any.
    pub fn lifetime_of(&self, name: &str) -> io::Result<Option<Lifetime>> {
        Ok(self.load_manifest()?.get(name).copied())
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    fn load_manifest(&self) -> io::Result<BTreeMap<String, Lifetime>> {
        match fs::read(self.manifest_path()) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }

    fn save_manifest(&self, manifest: &BTreeMap<String, Lifetime>) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(manifest)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_atomically(&self.root, &self.manifest_path(), &bytes)
    }
}

/// Writes `data` to `target` through a temp file in `dir` and a rename.
fn write_atomically(dir: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

impl ArtifactStore for DiskArtifactStore {
    fn persist(&self, name: &str, data: &[u8], lifetime: Lifetime) -> io::Result<StoredArtifact> {
        if name.is_empty() || name.contains(['/', '\\']) || name == MANIFEST_NAME {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid artifact name '{}'", name),
            ));
        }
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        write_atomically(&self.root, &path, data)?;

        let mut manifest = self.load_manifest()?;
        manifest.insert(name.to_string(), lifetime);
        self.save_manifest(&manifest)?;

        log::debug!(
            "Stored {:?} artifact {} ({} bytes)",
            lifetime,
            path.display(),
            data.len()
        );
        Ok(StoredArtifact {
            location: path.to_string_lossy().into_owned(),
            file_name: name.to_string(),
            size: data.len() as u64,
            created: SystemTime::now(),
        })
    }

    fn url_for(&self, artifact: &StoredArtifact) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|base| join_url(base, &artifact.file_name))
    }

    fn expire_temporary(&self, now: SystemTime, max_age: Duration) -> io::Result<Vec<String>> {
        let mut manifest = self.load_manifest()?;
        let now = FileTime::from_system_time(now);
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let mut removed = Vec::new();

        for (name, lifetime) in &manifest {
            if *lifetime != Lifetime::Temporary {
                continue;
            }
            let path = self.root.join(name);
            let stale = match fs::metadata(&path) {
                Ok(meta) => {
                    let modified = FileTime::from_last_modification_time(&meta);
                    now.unix_seconds().saturating_sub(modified.unix_seconds()) > max_age
                }
                // Already gone, drop it from the manifest
                Err(e) if e.kind() == io::ErrorKind::NotFound => true,
                Err(e) => return Err(e),
            };
            if stale {
                match fs::remove_file(&path) {
                    Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                    _ => removed.push(name.clone()),
                }
            }
        }

        if !removed.is_empty() {
            for name in &removed {
                manifest.remove(name);
            }
            self.save_manifest(&manifest)?;
            log::info!(
                "Expired {} temporary artifact(s) in {}",
                removed.len(),
                self.root.display()
            );
        }
        Ok(removed)
    }
}
