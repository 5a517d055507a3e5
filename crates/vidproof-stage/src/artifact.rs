//! Output checks applied after a stage exits.
//!
//! A zero exit status is necessary but not sufficient: the stage must also
//! leave behind the output it declared. Stale files are removed before the
//! stage runs so an artifact from an earlier run is never taken for this
//! run's output.

use crate::invocation::{Expect, Invocation, StageOutput};
use crate::runner::StageRunner;
use crate::Stage;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;
use vidproof_core::{Error, Result};

/// Remove a leftover file at `path`, if any.
pub fn clear_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale artifact");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(format!("removing stale {}", path.display()), e)),
    }
}

/// Require a non-empty file at `path`; returns its size.
pub fn require_artifact(stage: Stage, path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(m) if m.is_file() && m.len() > 0 => Ok(m.len()),
        Ok(_) => Err(missing(stage, path.display().to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(missing(stage, path.display().to_string()))
        }
        Err(e) => Err(Error::io(format!("inspecting {}", path.display()), e)),
    }
}

/// Require non-blank standard output; returns it trimmed.
pub fn require_stdout(stage: Stage, out: &StageOutput) -> Result<String> {
    let text = out.stdout_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(missing(stage, "stdout".to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn missing(stage: Stage, artifact: String) -> Error {
    Error::ArtifactMissing {
        stage: stage.as_str(),
        artifact,
    }
}

/// Clear stale output, run `inv`, then hold it to its declared output.
pub fn execute<R: StageRunner + ?Sized>(runner: &R, inv: &Invocation) -> Result<StageOutput> {
    if let Expect::File(path) = &inv.expect {
        clear_stale(path)?;
    }
    let out = runner.run(inv)?;
    match &inv.expect {
        Expect::File(path) => {
            let len = require_artifact(inv.stage, path)?;
            debug!(stage = %inv.stage, path = %path.display(), len, "artifact present");
        }
        Expect::Stdout => {
            require_stdout(inv.stage, &out)?;
        }
        Expect::ExitOnly => {}
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<u8>);

    impl StageRunner for Fixed {
        fn run(&self, _inv: &Invocation) -> Result<StageOutput> {
            Ok(StageOutput {
                stdout: self.0.clone(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn stale_file_does_not_count_as_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("phashes.txt");
        fs::write(&out, "from an earlier run").unwrap();
        let inv = Invocation::new(Stage::PerceptualHash, "rust-phash")
            .expect(Expect::File(out.clone()));
        let err = execute(&Fixed(Vec::new()), &inv).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing { stage: "perceptual-hash", .. }), "{err}");
        assert!(!out.exists());
    }

    #[test]
    fn empty_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("frames.txt");
        fs::write(&p, "").unwrap();
        assert!(matches!(
            require_artifact(Stage::ExtractFrames, &p),
            Err(Error::ArtifactMissing { .. })
        ));
        fs::write(&p, "f0\n").unwrap();
        assert_eq!(require_artifact(Stage::ExtractFrames, &p).unwrap(), 3);
    }

    #[test]
    fn blank_stdout_is_missing() {
        let inv = Invocation::new(Stage::Challenge, "zkptrans").expect(Expect::Stdout);
        let err = execute(&Fixed(b"  \n".to_vec()), &inv).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing { stage: "challenge", .. }));
        let ok = execute(&Fixed(b"C1\n".to_vec()), &inv).unwrap();
        assert_eq!(require_stdout(Stage::Challenge, &ok).unwrap(), "C1");
    }
}
