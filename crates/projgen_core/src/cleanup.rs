//! Stale output cleanup.
//!
//! The outputs of each run are stored in a small JSON database. On the next
//! run, files that were produced before but not anymore are removed, unless
//! they are read-only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GenResult;
use crate::fs::FileSystem;
use crate::session::GenerationSession;
use crate::writer::{delete_if_writable, DeleteOutcome};

const DATABASE_VERSION: u32 = 1;

/// Outputs recorded by a previous run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputDatabase {
    pub version: u32,
    pub files: BTreeMap<PathBuf, DateTime<Utc>>,
}

/// Summary of a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<PathBuf>,
    /// Stale files that could not be deleted.
    pub kept: Vec<PathBuf>,
}

impl OutputDatabase {
    pub fn from_session(session: &GenerationSession) -> Self {
        Self {
            version: DATABASE_VERSION,
            files: session.outputs(),
        }
    }

    /// Load the database; a missing, unreadable or outdated database is empty.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Self {
        let bytes = match fs.read(path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!("Cannot read output database {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_slice::<OutputDatabase>(&bytes) {
            Ok(db) if db.version == DATABASE_VERSION => db,
            Ok(db) => {
                warn!(
                    "Ignoring output database {} with version {}",
                    path.display(),
                    db.version
                );
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring corrupt output database {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, fs: &dyn FileSystem, path: &Path) -> GenResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs.write(path, &json)?;
        Ok(())
    }

    /// Files recorded here that `session` did not produce.
    pub fn stale_files(&self, session: &GenerationSession) -> Vec<PathBuf> {
        self.files
            .keys()
            .filter(|path| !session.produced(path))
            .cloned()
            .collect()
    }
}

/// Remove outputs of the previous run that this run no longer produces, then
/// store this run's outputs in the database at `database_path`.
pub fn cleanup_stale(
    fs: &dyn FileSystem,
    session: &GenerationSession,
    database_path: &Path,
) -> GenResult<CleanupReport> {
    let previous = OutputDatabase::load(fs, database_path);
    let mut report = CleanupReport::default();

    for path in previous.stale_files(session) {
        match delete_if_writable(fs, &path) {
            DeleteOutcome::Deleted => report.deleted.push(path),
            DeleteOutcome::Missing => {}
            DeleteOutcome::ReadOnly | DeleteOutcome::Blocked => report.kept.push(path),
        }
    }

    if !report.deleted.is_empty() {
        info!("Removed {} stale outputs", report.deleted.len());
    }

    OutputDatabase::from_session(session).save(fs, database_path)?;
    Ok(report)
}
