//! Roster change detection.
//!
//! The loop keeps the last fingerprint as a local and advances it through
//! [`step`]; nothing here holds state.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// SHA-256 hex digest of the roster file bytes. Compared for equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut h = Sha256::new();
        h.update(bytes);
        Fingerprint(hex::encode(h.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Roster bytes together with their fingerprint, read in one go so the
/// digest always matches what gets parsed.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub fingerprint: Fingerprint,
    pub bytes: Vec<u8>,
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot, SyncError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    Ok(Snapshot {
        fingerprint: Fingerprint::of_bytes(&bytes),
        bytes,
    })
}

/// Fingerprint of the file at `path`, `None` if it cannot be read.
pub fn fingerprint(path: &Path) -> Option<Fingerprint> {
    match read_snapshot(path) {
        Ok(snapshot) => Some(snapshot.fingerprint),
        Err(e) => {
            tracing::debug!("{e}");
            None
        }
    }
}

pub fn has_changed(previous: Option<&Fingerprint>, current: &Fingerprint) -> bool {
    previous != Some(current)
}

/// What the loop should do after one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    /// The roster could not be read; keep the previous fingerprint.
    Unreadable,
    Unchanged,
    /// Run a pass. The caller commits the fingerprint once the roster parses.
    Changed(Fingerprint),
}

pub fn step(last: Option<&Fingerprint>, current: Option<Fingerprint>) -> PollAction {
    match current {
        None => PollAction::Unreadable,
        Some(fp) if !has_changed(last, &fp) => PollAction::Unchanged,
        Some(fp) => PollAction::Changed(fp),
    }
}
