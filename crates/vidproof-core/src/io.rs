//! File helpers for agreements, proofs and public inputs.
//!
//! Everything the pipeline persists is either canonical JSON (so a file on
//! disk hashes to the same identifier the ledger sees) or the raw proof blob
//! exactly as the proving engine wrote it.

use crate::{Agreement, Error, Result, ZkPublicInput};
use std::fs;
use std::path::Path;

/// Ensure the parent directory for a file exists (no-op if none).
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .map_err(|e| Error::io(format!("creating parent directory {}", display(path)), e))?;
        }
    }
    Ok(())
}

/// ------------------------------
/// Agreement I/O
/// ------------------------------

/// Read an agreement from a JSON file.
pub fn read_agreement_json<P: AsRef<Path>>(path: P) -> Result<Agreement> {
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref).map_err(|e| Error::io(format!("read {}", display(path_ref)), e))?;
    Agreement::parse(&bytes)
}

/// Write an agreement as canonical JSON.
pub fn write_agreement_json<P: AsRef<Path>>(path: P, agreement: &Agreement) -> Result<()> {
    write_bytes(path, &agreement.to_canonical_bytes()?)
}

/// ------------------------------
/// Proof / public input I/O
/// ------------------------------

/// Read the proof blob written by the proving engine.
///
/// A missing or empty file is [`Error::ProofArtifactMissing`].
pub fn read_proof_blob<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path_ref = path.as_ref();
    match fs::read(path_ref) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(Error::ProofArtifactMissing {
            path: path_ref.to_owned(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ProofArtifactMissing {
            path: path_ref.to_owned(),
        }),
        Err(e) => Err(Error::io(format!("read {}", display(path_ref)), e)),
    }
}

/// Write public inputs as canonical JSON.
pub fn write_public_input_json<P: AsRef<Path>>(path: P, pi: &ZkPublicInput) -> Result<()> {
    write_bytes(path, pi.to_json()?.as_bytes())
}

/// Write raw bytes, creating parent directories as needed.
pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    fs::write(path_ref, bytes).map_err(|e| Error::io(format!("write {}", display(path_ref)), e))
}

/// Human-friendly path display for error messages.
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProofKind;

    #[test]
    fn agreement_file_roundtrip_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agreement.json");
        let a = Agreement::new("s3://bucket/v.ts", ProofKind::PhashMerkleZksnark, "C1");
        write_agreement_json(&path, &a).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), a.to_canonical_bytes().unwrap());
        assert_eq!(read_agreement_json(&path).unwrap(), a);
    }

    #[test]
    fn missing_or_empty_proof_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zkpor_proof.dat");
        assert!(matches!(
            read_proof_blob(&path),
            Err(Error::ProofArtifactMissing { .. })
        ));
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(
            read_proof_blob(&path),
            Err(Error::ProofArtifactMissing { .. })
        ));
        std::fs::write(&path, [0xAA; 4]).unwrap();
        assert_eq!(read_proof_blob(&path).unwrap(), vec![0xAA; 4]);
    }
}
