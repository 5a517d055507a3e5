//! Error taxonomy shared by every vidproof crate.
//!
//! All failures are fatal to the operation that raised them: nothing in the
//! workspace retries. Stage errors carry the stage name, the program, its
//! argument vector and whatever the tool wrote to standard error so that an
//! operator can re-run the exact command by hand.

use std::fmt;
use std::path::PathBuf;

/// Convenience alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// How a child process ended when it did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The process exited with this non-zero code.
    Code(i32),
    /// The process was terminated by a signal (no exit code available).
    Signal,
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(c) => write!(f, "exit code {c}"),
            Self::Signal => f.write_str("terminated by signal"),
        }
    }
}

/// Every failure the pipeline can surface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The stage executable could not be started (missing binary, permissions).
    #[error("stage `{stage}`: cannot launch `{program}`: {source}")]
    StageLaunch {
        /// Stage name.
        stage: &'static str,
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The stage ran but did not exit successfully.
    #[error("stage `{stage}` failed ({exit}): `{program} {}`\n{stderr}", .args.join(" "))]
    StageExecution {
        /// Stage name.
        stage: &'static str,
        /// Program that was run.
        program: String,
        /// Arguments it was run with.
        args: Vec<String>,
        /// How it ended.
        exit: Exit,
        /// Captured standard error, in full.
        stderr: String,
    },

    /// The stage exited cleanly but its declared output is absent or empty.
    #[error("stage `{stage}` reported success but produced no output at {artifact}")]
    ArtifactMissing {
        /// Stage name.
        stage: &'static str,
        /// The declared output (a path, or `stdout`).
        artifact: String,
    },

    /// The proof blob could not be read back after proof generation.
    #[error("proof artifact missing or empty: {}", .path.display())]
    ProofArtifactMissing {
        /// Expected proof file.
        path: PathBuf,
    },

    /// Agreement JSON is invalid or names an unknown proof kind.
    #[error("malformed agreement: {0}")]
    MalformedAgreement(String),

    /// Proof JSON is invalid or its blob is not valid base64.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// Public input JSON is invalid or contains non-hex fields.
    #[error("malformed public input: {0}")]
    MalformedPublicInput(String),

    /// Identifier is not a URL-safe base64 SHA-256 digest.
    #[error("invalid agreement identifier `{0}`")]
    InvalidIdentifier(String),

    /// Querying the ledger failed at the process or transport level.
    #[error("ledger query for `{id}` failed: {reason}")]
    LedgerQuery {
        /// Identifier that was queried.
        id: String,
        /// What went wrong.
        reason: String,
    },

    /// The ledger answered, but holds no agreement under this identifier.
    #[error("no agreement recorded for `{id}`")]
    AgreementNotFound {
        /// Identifier that was queried.
        id: String,
    },

    /// The ledger answered, but no proof has been committed for this identifier.
    #[error("no proof committed for `{id}`")]
    CommitNotFound {
        /// Identifier that was queried.
        id: String,
    },

    /// The run was cancelled while `stage` was in flight.
    #[error("cancelled during stage `{stage}`")]
    Cancelled {
        /// Stage that was interrupted.
        stage: &'static str,
    },

    /// Another run holds the working directory.
    #[error("working directory {} is in use by another run", .path.display())]
    WorkDirBusy {
        /// Locked directory.
        path: PathBuf,
    },

    /// Configuration is invalid or a required input file is absent.
    #[error("configuration: {0}")]
    Config(String),

    /// Encoding a value to JSON failed.
    #[error("encode: {0}")]
    Encode(String),

    /// Filesystem error with context.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Build an [`Error::Io`] with a context string.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The pipeline stage this error is attributed to, when there is one.
    #[must_use]
    pub const fn stage(&self) -> Option<&'static str> {
        match self {
            Self::StageLaunch { stage, .. }
            | Self::StageExecution { stage, .. }
            | Self::ArtifactMissing { stage, .. }
            | Self::Cancelled { stage } => Some(*stage),
            _ => None,
        }
    }
}
