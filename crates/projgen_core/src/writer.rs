//! Idempotent output writing.
//!
//! Outputs are compared byte for byte with what is on disk and only written
//! when they differ, so IDEs and build tools watching timestamps do not
//! reload unchanged files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GenError, GenResult};
use crate::fs::FileSystem;
use crate::session::GenerationSession;

/// What happened to one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New or changed content was written.
    Generated,
    /// Content on disk was identical; the file was not touched.
    Skipped,
}

/// Result of a write through the shared-output registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedOutcome {
    Written(WriteOutcome),
    /// Another caller in this session already handled the output.
    AlreadyHandled,
}

/// Result of a guarded delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Missing,
    /// The file is read-only, most likely checked into version control.
    ReadOnly,
    /// Deletion failed; the file was left in place.
    Blocked,
}

/// Ordered lists of outputs produced by a generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub generated: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl GenerationOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: impl Into<PathBuf>, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Generated => self.generated.push(path.into()),
            WriteOutcome::Skipped => self.skipped.push(path.into()),
        }
    }

    pub fn merge(&mut self, other: GenerationOutput) {
        self.generated.extend(other.generated);
        self.skipped.extend(other.skipped);
    }

    /// Whether any output changed on disk.
    pub fn has_changed(&self) -> bool {
        !self.generated.is_empty()
    }

    pub fn len(&self) -> usize {
        self.generated.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for GenerationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Generated: {:2} Skipped: {:2}",
            self.generated.len(),
            self.skipped.len()
        )
    }
}

/// Writes outputs only when their content changed.
pub struct OutputWriter<'a> {
    fs: &'a dyn FileSystem,
    session: &'a GenerationSession,
    overwrite_read_only: bool,
}

impl<'a> OutputWriter<'a> {
    pub fn new(fs: &'a dyn FileSystem, session: &'a GenerationSession) -> Self {
        Self {
            fs,
            session,
            overwrite_read_only: true,
        }
    }

    /// Whether changed outputs that are read-only on disk are made writable
    /// and replaced. When disabled such writes fail with
    /// [`GenError::FilesystemConflict`].
    pub fn overwrite_read_only(mut self, overwrite: bool) -> Self {
        self.overwrite_read_only = overwrite;
        self
    }

    pub fn session(&self) -> &GenerationSession {
        self.session
    }

    /// Write `content` to `path` unless the file already holds exactly it.
    pub fn write(&self, path: &Path, content: &[u8]) -> GenResult<WriteOutcome> {
        self.session.record_output(path);

        if let Some(existing) = self.fs.read(path)? {
            if existing == content {
                debug!("Skipped: {}", path.display());
                return Ok(WriteOutcome::Skipped);
            }

            if self.fs.is_read_only(path)? {
                if !self.overwrite_read_only {
                    return Err(GenError::FilesystemConflict {
                        path: path.to_path_buf(),
                        reason: "file is read-only and its content changed".to_string(),
                    });
                }
                self.fs.set_read_only(path, false)?;
            }
        }

        self.fs.write(path, content)?;
        debug!("Generated: {}", path.display());
        Ok(WriteOutcome::Generated)
    }

    /// [`OutputWriter::write`] and record the outcome in `output`.
    pub fn write_into(
        &self,
        path: &Path,
        content: &[u8],
        output: &mut GenerationOutput,
    ) -> GenResult<WriteOutcome> {
        let outcome = self.write(path, content)?;
        output.record(path, outcome);
        Ok(outcome)
    }

    /// Generate an output shared by several callers at most once per session.
    ///
    /// The first caller claims `path`, renders and writes it; later callers
    /// get [`SharedOutcome::AlreadyHandled`] without rendering. A failed
    /// render gives the claim back.
    pub fn write_shared<F>(
        &self,
        path: &Path,
        render: F,
        output: &mut GenerationOutput,
    ) -> GenResult<SharedOutcome>
    where
        F: FnOnce() -> GenResult<Vec<u8>>,
    {
        if !self.session.claim_shared(path) {
            return Ok(SharedOutcome::AlreadyHandled);
        }

        let result = render().and_then(|content| self.write_into(path, &content, output));
        match result {
            Ok(outcome) => Ok(SharedOutcome::Written(outcome)),
            Err(e) => {
                self.session.release_shared(path);
                Err(e)
            }
        }
    }

    /// Delete the shared outputs deferred with
    /// [`GenerationSession::defer_stale_shared`] that no caller claimed.
    ///
    /// Call once every caller of the session has finished.
    pub fn remove_unclaimed_stale(&self) -> Vec<(PathBuf, DeleteOutcome)> {
        self.session
            .remove_unclaimed_stale(|path| delete_if_writable(self.fs, path))
    }
}

/// Delete `path` unless it is read-only. Problems are logged, not returned.
pub fn delete_if_writable(fs: &dyn FileSystem, path: &Path) -> DeleteOutcome {
    if !fs.exists(path) {
        return DeleteOutcome::Missing;
    }

    match fs.is_read_only(path) {
        Ok(true) => {
            warn!("Not deleting read-only file: {}", path.display());
            return DeleteOutcome::ReadOnly;
        }
        Ok(false) => {}
        Err(e) => {
            warn!("Cannot inspect {}: {}", path.display(), e);
            return DeleteOutcome::Blocked;
        }
    }

    match fs.remove(path) {
        Ok(()) => {
            debug!("Deleted: {}", path.display());
            DeleteOutcome::Deleted
        }
        Err(e) => {
            warn!("Cannot delete {}: {}", path.display(), e);
            DeleteOutcome::Blocked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_skip_identical() {
        let fs = MockFileSystem::new().with_file("/out/a.vcxproj", "same");
        let session = GenerationSession::new();
        let writer = OutputWriter::new(&fs, &session);

        let outcome = writer.write(Path::new("/out/a.vcxproj"), b"same").unwrap();
        assert_eq!(outcome, WriteOutcome::Skipped);
        assert_eq!(fs.write_count(), 0);
        assert!(session.produced(Path::new("/out/a.vcxproj")));
    }

    #[test]
    fn test_write_changed_and_new() {
        let fs = MockFileSystem::new().with_file("/out/a.vcxproj", "old");
        let session = GenerationSession::new();
        let writer = OutputWriter::new(&fs, &session);
        let mut output = GenerationOutput::new();

        writer
            .write_into(Path::new("/out/a.vcxproj"), b"new", &mut output)
            .unwrap();
        writer
            .write_into(Path::new("/out/b.vcxproj"), b"b", &mut output)
            .unwrap();

        assert_eq!(output.generated.len(), 2);
        assert!(output.skipped.is_empty());
        assert_eq!(fs.contents(Path::new("/out/a.vcxproj")).unwrap(), b"new");
    }

    #[test]
    fn test_read_only_changed_file() {
        let fs = MockFileSystem::new().with_read_only_file("/out/a.sln", "old");
        let session = GenerationSession::new();

        let strict = OutputWriter::new(&fs, &session).overwrite_read_only(false);
        assert!(matches!(
            strict.write(Path::new("/out/a.sln"), b"new"),
            Err(GenError::FilesystemConflict { .. })
        ));

        let writer = OutputWriter::new(&fs, &session);
        let outcome = writer.write(Path::new("/out/a.sln"), b"new").unwrap();
        assert_eq!(outcome, WriteOutcome::Generated);
        assert!(fs.was_called("set_read_only"));
    }

    #[test]
    fn test_read_only_identical_file_untouched() {
        let fs = MockFileSystem::new().with_read_only_file("/out/a.sln", "same");
        let session = GenerationSession::new();
        let writer = OutputWriter::new(&fs, &session).overwrite_read_only(false);

        assert_eq!(
            writer.write(Path::new("/out/a.sln"), b"same").unwrap(),
            WriteOutcome::Skipped
        );
        assert!(!fs.was_called("set_read_only"));
    }

    #[test]
    fn test_delete_guarded() {
        let fs = MockFileSystem::new()
            .with_read_only_file("/p/packages.config", "x")
            .with_file("/q/packages.config", "x")
            .with_file("/r/packages.config", "x")
            .lock_file("/r/packages.config");

        assert_eq!(
            delete_if_writable(&fs, Path::new("/p/packages.config")),
            DeleteOutcome::ReadOnly
        );
        assert_eq!(
            delete_if_writable(&fs, Path::new("/q/packages.config")),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            delete_if_writable(&fs, Path::new("/r/packages.config")),
            DeleteOutcome::Blocked
        );
        assert_eq!(
            delete_if_writable(&fs, Path::new("/s/packages.config")),
            DeleteOutcome::Missing
        );
        assert!(fs.exists(Path::new("/p/packages.config")));
    }

    #[test]
    fn test_shared_render_failure_releases_claim() {
        let fs = MockFileSystem::new();
        let session = GenerationSession::new();
        let writer = OutputWriter::new(&fs, &session);
        let mut output = GenerationOutput::new();
        let path = Path::new("/p/packages.config");

        let failed = writer.write_shared(
            path,
            || Err(GenError::InvalidModel("boom".into())),
            &mut output,
        );
        assert!(failed.is_err());

        let outcome = writer
            .write_shared(path, || Ok(b"ok".to_vec()), &mut output)
            .unwrap();
        assert_eq!(outcome, SharedOutcome::Written(WriteOutcome::Generated));

        let again = writer
            .write_shared(path, || panic!("must not render twice"), &mut output)
            .unwrap();
        assert_eq!(again, SharedOutcome::AlreadyHandled);
    }
}
