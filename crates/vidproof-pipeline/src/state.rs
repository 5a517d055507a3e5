//! Run state machine and the report a finished run hands back.
//!
//! A run only moves forward: `Init`, then the flow's stages in order, then
//! `Done`. Any failure moves it to the terminal `Failed` state.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info};
use vidproof_core::Error;

/// Which flow a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Produce and submit a new agreement.
    Publish,
    /// Produce and commit a proof for an existing agreement.
    Mine,
    /// Check a committed proof.
    Verify,
    /// Produce the CRS parameter file.
    Setup,
}

impl Flow {
    /// Short stable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Mine => "mine",
            Self::Verify => "verify",
            Self::Setup => "setup",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Not started.
    Init,
    /// Looking the agreement (and proof) up on the ledger.
    Resolving,
    /// Sampling frames.
    Extracting,
    /// Hashing frames.
    Hashing,
    /// Requesting the challenge.
    Challenging,
    /// Generating the proof (or the CRS).
    Proving,
    /// Checking a committed proof.
    Verifying,
    /// Issuing the single ledger transaction.
    Submitting,
    /// Finished successfully.
    Done,
    /// Terminal failure.
    Failed {
        /// Stage (or state) the run failed in.
        stage: &'static str,
        /// Rendered cause.
        cause: String,
    },
}

impl RunState {
    /// Short stable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Resolving => "resolving",
            Self::Extracting => "extracting",
            Self::Hashing => "hashing",
            Self::Challenging => "challenging",
            Self::Proving => "proving",
            Self::Verifying => "verifying",
            Self::Submitting => "submitting",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Init => 0,
            Self::Resolving => 1,
            Self::Extracting => 2,
            Self::Hashing => 3,
            Self::Challenging => 4,
            Self::Proving => 5,
            Self::Verifying => 6,
            Self::Submitting => 7,
            Self::Done => 8,
            Self::Failed { .. } => 9,
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Whether `next` is a legal successor.
    #[must_use]
    pub const fn can_advance_to(&self, next: &Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(next, Self::Failed { .. }) || next.rank() > self.rank()
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { stage, cause } => write!(f, "failed in {stage}: {cause}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Flow that ran.
    pub flow: Flow,
    /// States visited, in order, starting with `Init` and ending with `Done`
    /// or `Failed`.
    pub history: Vec<RunState>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Final state.
    #[must_use]
    pub fn last(&self) -> Option<&RunState> {
        self.history.last()
    }

    /// Stage the run failed in, if it failed.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&'static str> {
        match self.last() {
            Some(RunState::Failed { stage, .. }) => Some(*stage),
            _ => None,
        }
    }
}

/// Tracks one run through its states.
#[derive(Debug)]
pub(crate) struct Run {
    flow: Flow,
    history: Vec<RunState>,
    started: Instant,
}

impl Run {
    pub(crate) fn start(flow: Flow) -> Self {
        info!(%flow, "run started");
        Self {
            flow,
            history: vec![RunState::Init],
            started: Instant::now(),
        }
    }

    pub(crate) fn state(&self) -> &RunState {
        self.history.last().unwrap_or(&RunState::Init)
    }

    pub(crate) fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state().can_advance_to(&next),
            "illegal transition {} -> {}",
            self.state(),
            next
        );
        info!(flow = %self.flow, state = next.as_str(), "transition");
        self.history.push(next);
    }

    /// Move to `Failed`, attributing `err` to its stage (or the current state).
    pub(crate) fn fail(mut self, err: &Error) -> RunReport {
        let stage = err.stage().unwrap_or_else(|| self.state().as_str());
        error!(flow = %self.flow, stage, error = %err, "run failed");
        self.advance(RunState::Failed {
            stage,
            cause: err.to_string(),
        });
        self.into_report()
    }

    pub(crate) fn finish(mut self) -> RunReport {
        self.advance(RunState::Done);
        let report = self.into_report();
        info!(flow = %report.flow, elapsed_ms = report.elapsed.as_millis() as u64, "run finished");
        report
    }

    fn into_report(self) -> RunReport {
        RunReport {
            flow: self.flow,
            history: self.history,
            elapsed: self.started.elapsed(),
        }
    }
}
