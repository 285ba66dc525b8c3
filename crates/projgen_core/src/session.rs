//! Per-run generation session.
//!
//! A session is the only state shared between the projects of one run. It
//! tracks which shared outputs have already been claimed and which files the
//! run produced. Independent sessions never see each other's state.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::writer::DeleteOutcome;

/// Claims on shared outputs and shared outputs asked to be removed.
#[derive(Debug, Default)]
struct SharedOutputs {
    claimed: HashSet<PathBuf>,
    stale: BTreeSet<PathBuf>,
}

/// State shared by every project generated in one run.
#[derive(Debug, Default)]
pub struct GenerationSession {
    shared: Mutex<SharedOutputs>,
    outputs: Mutex<BTreeMap<PathBuf, DateTime<Utc>>>,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check and mark a shared output.
    ///
    /// Returns `true` for exactly one caller per path and session; every
    /// later caller gets `false`.
    pub fn claim_shared(&self, path: &Path) -> bool {
        let key = output_key(path);
        let claimed = self.shared.lock().claimed.insert(key.clone());
        if !claimed {
            debug!("Shared output already handled: {}", key.display());
        }
        claimed
    }

    /// Give a claim back so another caller may generate the output.
    pub fn release_shared(&self, path: &Path) {
        self.shared.lock().claimed.remove(&output_key(path));
    }

    pub fn is_shared_claimed(&self, path: &Path) -> bool {
        self.shared.lock().claimed.contains(&output_key(path))
    }

    /// Ask for a shared output to be removed once every caller of the run
    /// has made its claims.
    pub fn defer_stale_shared(&self, path: &Path) {
        self.shared.lock().stale.insert(output_key(path));
    }

    /// Remove every deferred shared output that nobody claimed.
    ///
    /// The claim check and `delete` run under the claim lock, so a path can
    /// not be claimed between the decision and the removal. Claimed paths
    /// are dropped from the pending set untouched.
    pub fn remove_unclaimed_stale<F>(&self, mut delete: F) -> Vec<(PathBuf, DeleteOutcome)>
    where
        F: FnMut(&Path) -> DeleteOutcome,
    {
        let mut shared = self.shared.lock();
        let stale = std::mem::take(&mut shared.stale);
        stale
            .into_iter()
            .filter(|path| !shared.claimed.contains(path))
            .map(|path| {
                let outcome = delete(&path);
                (path, outcome)
            })
            .collect()
    }

    /// Record that `path` is an output of this run.
    pub fn record_output(&self, path: &Path) {
        self.outputs.lock().insert(output_key(path), Utc::now());
    }

    /// Every output recorded so far with the time it was recorded.
    pub fn outputs(&self) -> BTreeMap<PathBuf, DateTime<Utc>> {
        self.outputs.lock().clone()
    }

    pub fn produced(&self, path: &Path) -> bool {
        self.outputs.lock().contains_key(&output_key(path))
    }
}

/// Registry key for an output path: absolute, with `.` components removed.
pub fn output_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_claim_once() {
        let session = GenerationSession::new();
        let path = Path::new("/work/packages.config");

        assert!(session.claim_shared(path));
        assert!(!session.claim_shared(path));
        assert!(!session.claim_shared(Path::new("/work/./packages.config")));

        session.release_shared(path);
        assert!(session.claim_shared(path));
    }

    #[test]
    fn test_concurrent_claims() {
        let session = Arc::new(GenerationSession::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.claim_shared(Path::new("/shared/project.json")))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|claimed| *claimed)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_claimed_stale_output_is_kept() {
        let session = GenerationSession::new();
        let claimed = Path::new("/w/tools/packages.config");
        let unclaimed = Path::new("/w/old/packages.config");

        session.defer_stale_shared(claimed);
        session.defer_stale_shared(unclaimed);
        assert!(session.claim_shared(claimed));

        let mut deleted = Vec::new();
        let removed = session.remove_unclaimed_stale(|path| {
            deleted.push(path.to_path_buf());
            DeleteOutcome::Deleted
        });

        assert_eq!(deleted, vec![unclaimed.to_path_buf()]);
        assert_eq!(removed, vec![(unclaimed.to_path_buf(), DeleteOutcome::Deleted)]);
        assert!(session
            .remove_unclaimed_stale(|_| DeleteOutcome::Deleted)
            .is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let first = GenerationSession::new();
        let second = GenerationSession::new();
        let path = Path::new("/shared/packages.config");

        assert!(first.claim_shared(path));
        assert!(second.claim_shared(path));
    }
}
