//! Filesystem access used by the output writer.
//!
//! [`OsFileSystem`] talks to the real disk; [`MockFileSystem`] keeps files in
//! memory and records every call so writer behavior can be verified without
//! touching the disk.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::NamedTempFile;

/// Blocking filesystem operations needed for idempotent output.
pub trait FileSystem: Send + Sync {
    /// Read a whole file, `None` if it does not exist.
    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Replace the file at `path` atomically, creating parent directories.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_read_only(&self, path: &Path) -> io::Result<bool>;

    fn set_read_only(&self, path: &Path, read_only: bool) -> io::Result<()>;

    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp = new_temp_file(parent)?;
        if let Ok(metadata) = fs::metadata(path) {
            temp.as_file().set_permissions(metadata.permissions())?;
        }
        temp.write_all(contents)?;
        temp.flush()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_read_only(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::metadata(path)?.permissions().readonly())
    }

    #[allow(clippy::permissions_set_readonly_false)]
    fn set_read_only(&self, path: &Path, read_only: bool) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(read_only);
        fs::set_permissions(path, permissions)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Temporary file next to the output. New outputs get the usual `0644`
/// mode, narrowed by the process umask, instead of the private `0600`.
#[cfg(unix)]
fn new_temp_file(dir: &Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    tempfile::Builder::new()
        .permissions(fs::Permissions::from_mode(0o644))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn new_temp_file(dir: &Path) -> io::Result<NamedTempFile> {
    NamedTempFile::new_in(dir)
}

/// A file held by [`MockFileSystem`].
#[derive(Debug, Clone, Default)]
pub struct MockFile {
    pub contents: Vec<u8>,
    pub read_only: bool,
}

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub method: String,
    pub path: PathBuf,
}

/// In-memory filesystem for tests.
#[derive(Clone, Default)]
pub struct MockFileSystem {
    files: Arc<RwLock<BTreeMap<PathBuf, MockFile>>>,
    /// Paths whose removal fails with `PermissionDenied`.
    locked: Arc<RwLock<HashSet<PathBuf>>>,
    writes: Arc<AtomicUsize>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.write().insert(
            path.into(),
            MockFile {
                contents: contents.into(),
                read_only: false,
            },
        );
        self
    }

    /// Seed a read-only file.
    pub fn with_read_only_file(
        self,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        self.files.write().insert(
            path.into(),
            MockFile {
                contents: contents.into(),
                read_only: true,
            },
        );
        self
    }

    /// Make removal of `path` fail as if another process held it open.
    pub fn lock_file(self, path: impl Into<PathBuf>) -> Self {
        self.locked.write().insert(path.into());
        self
    }

    pub fn file(&self, path: &Path) -> Option<MockFile> {
        self.files.read().get(path).cloned()
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.file(path).map(|f| f.contents)
    }

    /// Number of physical writes performed.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls.read().iter().any(|c| c.method == method)
    }

    fn record_call(&self, method: &str, path: &Path) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            path: path.to_path_buf(),
        });
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        self.record_call("read", path);
        Ok(self.contents(path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.record_call("write", path);
        let mut files = self.files.write();
        if files.get(path).is_some_and(|f| f.read_only) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", path.display()),
            ));
        }
        files.insert(
            path.to_path_buf(),
            MockFile {
                contents: contents.to_vec(),
                read_only: false,
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn is_read_only(&self, path: &Path) -> io::Result<bool> {
        self.file(path)
            .map(|f| f.read_only)
            .ok_or_else(|| Self::not_found(path))
    }

    fn set_read_only(&self, path: &Path, read_only: bool) -> io::Result<()> {
        self.record_call("set_read_only", path);
        match self.files.write().get_mut(path) {
            Some(file) => {
                file.read_only = read_only;
                Ok(())
            }
            None => Err(Self::not_found(path)),
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.record_call("remove", path);
        if self.locked.read().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is locked", path.display()),
            ));
        }
        self.files
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(path))
    }
}
