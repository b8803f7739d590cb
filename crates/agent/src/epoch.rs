//! Persisted record of the last epoch an activation was attempted in.
//!
//! The driver may be restarted by its host environment at any time, so
//! the marker lives in a single human-readable file: one integer, no
//! prior attempt means no file. The marker is written *before* the
//! activation transaction is submitted, so a crash racing an in-flight
//! submission can never lead to a duplicate attempt within the epoch.

use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EpochStoreError {
    #[error("failed to read epoch file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write epoch file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("epoch file {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        source: std::num::ParseIntError,
    },
}

/// Returns whether a cycle at `current` may attempt activation given
/// the stored marker.
pub fn eligible(last_attempt: Option<u64>, current: u64) -> bool {
    last_attempt.map_or(true, |last| current > last)
}

pub struct EpochStore {
    path: PathBuf,
}

impl EpochStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The last epoch an attempt was recorded in, if any.
    pub fn last_attempt(&self) -> Result<Option<u64>, EpochStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|source| EpochStoreError::Parse {
                    path: self.path.clone(),
                    source,
                }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(EpochStoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Records an attempt at `epoch`. The marker is monotonic: marking
    /// an epoch at or below the stored one is a no-op.
    pub fn record_attempt(&self, epoch: u64) -> Result<(), EpochStoreError> {
        if let Some(last) = self.last_attempt()? {
            if last >= epoch {
                return Ok(());
            }
        }
        // Write-then-rename keeps the marker intact if the process dies
        // mid-write.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, format!("{epoch}\n")).map_err(|source| EpochStoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| EpochStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> EpochStore {
        EpochStore::new(dir.path().join("last_epoch"))
    }

    #[test]
    fn absent_file_means_no_prior_attempt() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store(&dir).last_attempt().unwrap(), None);
    }

    #[test]
    fn record_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.record_attempt(4).unwrap();
        assert_eq!(store.last_attempt().unwrap(), Some(4));
    }

    #[test]
    fn marker_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        store(&dir).record_attempt(9).unwrap();
        assert_eq!(store(&dir).last_attempt().unwrap(), Some(9));
    }

    #[test]
    fn repeated_attempts_in_one_epoch_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.record_attempt(4).unwrap();
        store.record_attempt(4).unwrap();
        assert_eq!(store.last_attempt().unwrap(), Some(4));
    }

    #[test]
    fn marker_never_moves_backwards() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.record_attempt(8).unwrap();
        store.record_attempt(5).unwrap();
        assert_eq!(store.last_attempt().unwrap(), Some(8));
    }

    #[test]
    fn corrupt_marker_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_epoch");
        fs::write(&path, "not a number\n").unwrap();
        let store = EpochStore::new(path);
        assert!(matches!(
            store.last_attempt(),
            Err(EpochStoreError::Parse { .. })
        ));
    }

    #[test_case::test_case(None, 4 => true; "no prior attempt")]
    #[test_case::test_case(Some(7), 7 => false; "same epoch is suppressed")]
    #[test_case::test_case(Some(7), 8 => true; "next epoch is eligible")]
    #[test_case::test_case(Some(7), 6 => false; "older epoch is suppressed")]
    fn eligibility(last: Option<u64>, current: u64) -> bool {
        eligible(last, current)
    }
}
