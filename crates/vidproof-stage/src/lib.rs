//! vidproof-stage — external tools as pipeline stages.
//!
//! A stage is one blocking call to an external program. This crate turns
//! that call into a typed outcome:
//! - [`Invocation`] names the stage, program, arguments and declared output;
//! - [`StageRunner`] executes it ([`ProcessRunner`] spawns a real child);
//! - [`artifact::execute`] wraps a runner with stale-output removal and the
//!   output checks that decide success.
//!
//! ```no_run
//! use vidproof_stage::{artifact, Expect, Invocation, ProcessRunner, Stage};
//!
//! let runner = ProcessRunner::default();
//! let inv = Invocation::new(Stage::PerceptualHash, "rust-phash")
//!     .args(["/w/scaled-frames.txt", "/w/phashes.txt"])
//!     .expect(Expect::File("/w/phashes.txt".into()));
//! artifact::execute(&runner, &inv)?;
//! # Ok::<(), vidproof_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

/// Output checks and the checked `execute` entry point.
pub mod artifact;
/// Cancellation token.
pub mod cancel;
/// Stage, invocation and captured output types.
pub mod invocation;
/// Runner trait and the child-process runner.
pub mod runner;

pub use cancel::CancelToken;
pub use invocation::{Expect, Invocation, Stage, StageOutput};
pub use runner::{ProcessRunner, StageRunner, DEFAULT_POLL};
