//! What a stage runs and what it must leave behind.

use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline stages, one per external tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Sample and scale frames from the source video.
    ExtractFrames,
    /// Perceptual hashes over the frame list.
    PerceptualHash,
    /// Challenge (public inputs) over the hash list.
    Challenge,
    /// zk-SNARK proof over the hash list.
    GenerateProof,
    /// Check a committed proof against its public inputs.
    VerifyProof,
    /// Produce the CRS parameter file.
    SetupCrs,
    /// Ledger `createSla` transaction.
    LedgerCreate,
    /// Ledger `commitProof` transaction.
    LedgerCommit,
    /// Read-only ledger query.
    LedgerQuery,
}

impl Stage {
    /// Short stable name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtractFrames => "extract-frames",
            Self::PerceptualHash => "perceptual-hash",
            Self::Challenge => "challenge",
            Self::GenerateProof => "generate-proof",
            Self::VerifyProof => "verify-proof",
            Self::SetupCrs => "setup-crs",
            Self::LedgerCreate => "ledger-create",
            Self::LedgerCommit => "ledger-commit",
            Self::LedgerQuery => "ledger-query",
        }
    }

    /// Whether this stage changes ledger state.
    #[must_use]
    pub const fn mutates_ledger(self) -> bool {
        matches!(self, Self::LedgerCreate | Self::LedgerCommit)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The output a stage is judged by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// A non-empty file at this path.
    File(PathBuf),
    /// Non-empty standard output.
    Stdout,
    /// A zero exit status is enough (ledger transactions; receipt unparsed).
    ExitOnly,
}

/// One external program call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Stage this call implements.
    pub stage: Stage,
    /// Program path or bare name (resolved via `PATH`).
    pub program: PathBuf,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Declared output.
    pub expect: Expect,
}

impl Invocation {
    /// New invocation with no arguments that only needs a clean exit.
    pub fn new(stage: Stage, program: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
            expect: Expect::ExitOnly,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument.
    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Declare the stage's output.
    #[must_use]
    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    /// Program as text, for logs and errors.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Captured output of a stage that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    /// Everything written to standard output.
    pub stdout: Vec<u8>,
    /// Everything written to standard error.
    pub stderr: String,
}

impl StageOutput {
    /// Standard output as (lossy) UTF-8.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_argument_order() {
        let inv = Invocation::new(Stage::PerceptualHash, "rust-phash")
            .path_arg(Path::new("/w/scaled-frames.txt"))
            .arg("/w/phashes.txt")
            .expect(Expect::File("/w/phashes.txt".into()));
        assert_eq!(inv.args, ["/w/scaled-frames.txt", "/w/phashes.txt"]);
        assert_eq!(inv.program_name(), "rust-phash");
    }

    #[test]
    fn only_transactions_mutate_the_ledger() {
        assert!(Stage::LedgerCreate.mutates_ledger());
        assert!(Stage::LedgerCommit.mutates_ledger());
        assert!(!Stage::LedgerQuery.mutates_ledger());
        assert!(!Stage::GenerateProof.mutates_ledger());
    }
}
