//! Runner abstraction and the real process-backed implementation.
//!
//! ## Contract implementors should uphold
//! - A program that cannot be started is [`Error::StageLaunch`].
//! - A program that ends with anything but exit code 0 is
//!   [`Error::StageExecution`] carrying the full standard error.
//! - Output is captured in full before the exit status is classified.
//! - A cancelled run is [`Error::Cancelled`]; the child must not be left
//!   running.
//!
//! Runners do **not** judge declared outputs; see [`crate::artifact`].

use crate::cancel::CancelToken;
use crate::invocation::{Invocation, StageOutput};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use vidproof_core::{Error, Exit, Result};
use wait_timeout::ChildExt;

/// Default interval between cancellation checks while a child runs.
pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

/// Executes one invocation and reports how it ended.
pub trait StageRunner {
    /// Run `inv` to completion.
    fn run(&self, inv: &Invocation) -> Result<StageOutput>;
}

impl<R: StageRunner + ?Sized> StageRunner for &R {
    fn run(&self, inv: &Invocation) -> Result<StageOutput> {
        (**self).run(inv)
    }
}

/// Runs stages as local child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    cancel: CancelToken,
    poll: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(CancelToken::new())
    }
}

impl ProcessRunner {
    /// Runner observing `cancel`.
    #[must_use]
    pub const fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            poll: DEFAULT_POLL,
        }
    }

    /// Override the cancellation poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// The token this runner observes.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

type Reader = JoinHandle<std::io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Reader {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

/// Upper bound on the reader poll once the child has exited.
const READER_POLL: Duration = Duration::from_millis(5);

fn kill(child: &mut Child, inv: &Invocation) {
    if let Err(e) = child.kill() {
        warn!(stage = %inv.stage, error = %e, "failed to kill child");
    }
    let _ = child.wait();
}

impl ProcessRunner {
    /// Collect one reader's output.
    ///
    /// The child has exited, but a background grandchild may still hold the
    /// pipe open, so the wait stays cancellable.
    fn join(&self, reader: Option<Reader>, what: &str, stage: &'static str) -> Result<Vec<u8>> {
        let Some(handle) = reader else {
            return Ok(Vec::new());
        };
        while !handle.is_finished() {
            if self.cancel.is_cancelled() {
                warn!(stage, what, "cancelled while the output pipe is still open");
                return Err(Error::Cancelled { stage });
            }
            thread::sleep(self.poll.min(READER_POLL));
        }
        handle
            .join()
            .map_err(|_| Error::io(format!("reading {what}"), std::io::Error::other("reader thread panicked")))?
            .map_err(|e| Error::io(format!("reading {what}"), e))
    }
}

impl StageRunner for ProcessRunner {
    fn run(&self, inv: &Invocation) -> Result<StageOutput> {
        let stage = inv.stage.as_str();
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled { stage });
        }

        debug!(stage, program = %inv.program.display(), args = ?inv.args, "launching");
        let started = Instant::now();
        let mut child = Command::new(&inv.program)
            .args(&inv.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::StageLaunch {
                stage,
                program: inv.program_name(),
                source,
            })?;

        // Both pipes are drained concurrently so a chatty tool never blocks on
        // a full buffer while we wait on it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = loop {
            match child.wait_timeout(self.poll) {
                Ok(Some(status)) => break status,
                Ok(None) if self.cancel.is_cancelled() => {
                    warn!(stage, "cancellation requested, terminating child");
                    kill(&mut child, inv);
                    // Readers are detached: a grandchild may still hold the pipes.
                    drop((stdout, stderr));
                    return Err(Error::Cancelled { stage });
                }
                Ok(None) => {}
                Err(e) => {
                    kill(&mut child, inv);
                    return Err(Error::io(format!("waiting on {}", inv.program_name()), e));
                }
            }
        };

        let stdout = self.join(stdout, "stdout", stage)?;
        let stderr = String::from_utf8_lossy(&self.join(stderr, "stderr", stage)?).into_owned();
        if !stderr.trim().is_empty() {
            debug!(stage, stderr = %stderr.trim_end(), "diagnostics");
        }

        if !status.success() {
            return Err(Error::StageExecution {
                stage,
                program: inv.program_name(),
                args: inv.args.clone(),
                exit: status.code().map_or(Exit::Signal, Exit::Code),
                stderr,
            });
        }

        info!(
            stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = stdout.len(),
            "stage finished"
        );
        Ok(StageOutput { stdout, stderr })
    }
}
