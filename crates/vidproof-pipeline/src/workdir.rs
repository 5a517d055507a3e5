//! Exclusive lease on the working directory.
//!
//! Intermediate files have fixed names, so two runs sharing a directory would
//! overwrite each other. A run holds an advisory lock on
//! `<work_dir>/.vidproof.lock` for as long as its [`WorkDir`] lives.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vidproof_core::{Error, Result};

/// Lock file name.
pub const LOCK_FILE: &str = ".vidproof.lock";
/// Sampled frame list.
pub const FRAMES_FILE: &str = "scaled-frames.txt";
/// Perceptual hash list.
pub const HASHES_FILE: &str = "phashes.txt";
/// Proof blob written by the proving engine.
pub const PROOF_FILE: &str = "zkpor_proof.dat";
/// Witness written alongside the proof.
pub const WITNESS_FILE: &str = "zkpor_witness.dat";
/// Proof fetched back from the ledger for verification.
pub const COMMITTED_PROOF_FILE: &str = "zkpor_committed_proof.dat";
/// Public inputs for verification.
pub const PUBLIC_INPUTS_FILE: &str = "zkpor_public_inputs.json";
/// Canonical agreement written by the publish flow.
pub const AGREEMENT_FILE: &str = "agreement.json";

/// A working directory held exclusively by one run.
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
    lock: File,
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl WorkDir {
    /// Create `path` if needed and lock it without blocking.
    ///
    /// Fails with [`Error::WorkDirBusy`] when another run holds the lock.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| Error::io(format!("create work dir {}", root.display()), e))?;

        let lock_path = root.join(LOCK_FILE);
        let mut lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Error::io(format!("open {}", lock_path.display()), e))?;

        match lock.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if is_contended(&e) => return Err(Error::WorkDirBusy { path: root }),
            Err(e) => return Err(Error::io(format!("lock {}", lock_path.display()), e)),
        }

        // Owner pid, for operators inspecting a stuck directory.
        if let Err(e) = lock.set_len(0).and_then(|()| writeln!(lock, "{}", std::process::id())) {
            warn!(path = %lock_path.display(), error = %e, "cannot record lock owner");
        }
        debug!(path = %root.display(), "work dir acquired");
        Ok(Self { root, lock })
    }

    /// Directory root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `name` inside the directory.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Sampled frame list.
    #[must_use]
    pub fn frames(&self) -> PathBuf {
        self.file(FRAMES_FILE)
    }

    /// Perceptual hash list.
    #[must_use]
    pub fn hashes(&self) -> PathBuf {
        self.file(HASHES_FILE)
    }

    /// Generated proof blob.
    #[must_use]
    pub fn proof(&self) -> PathBuf {
        self.file(PROOF_FILE)
    }

    /// Generated witness.
    #[must_use]
    pub fn witness(&self) -> PathBuf {
        self.file(WITNESS_FILE)
    }

    /// Proof fetched from the ledger.
    #[must_use]
    pub fn committed_proof(&self) -> PathBuf {
        self.file(COMMITTED_PROOF_FILE)
    }

    /// Public inputs for verification.
    #[must_use]
    pub fn public_inputs(&self) -> PathBuf {
        self.file(PUBLIC_INPUTS_FILE)
    }

    /// Published agreement.
    #[must_use]
    pub fn agreement(&self) -> PathBuf {
        self.file(AGREEMENT_FILE)
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock) {
            warn!(path = %self.root.display(), error = %e, "failed to release work dir lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lease_is_refused_until_first_drops() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("work");
        let first = WorkDir::acquire(&dir).unwrap();
        assert!(dir.join(LOCK_FILE).is_file());

        match WorkDir::acquire(&dir) {
            Err(Error::WorkDirBusy { path }) => assert_eq!(path, dir),
            other => panic!("expected WorkDirBusy, got {other:?}"),
        }

        drop(first);
        let again = WorkDir::acquire(&dir).unwrap();
        assert_eq!(again.frames(), dir.join("scaled-frames.txt"));
    }
}
