//! vidproof-pipeline — the proof-of-storage flows.
//!
//! - **publish**: sample a video, hash its frames, obtain a challenge and
//!   submit the resulting agreement to the ledger.
//! - **mine**: resolve an agreement, re-derive the hashes from its video,
//!   generate a zk proof and commit it.
//! - **verify**: fetch a committed proof and check it against the agreement's
//!   public inputs.
//! - **setup**: produce the CRS parameter file the proving engine needs.
//!
//! ```no_run
//! use vidproof_pipeline::{Pipeline, PipelineConfig};
//! use vidproof_stage::ProcessRunner;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default(), ProcessRunner::default());
//! let outcome = pipeline.publish("movie.mp4", "out.ts")?;
//! println!("{}", outcome.identifier);
//! # Ok::<(), vidproof_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

/// TOML configuration.
pub mod config;
/// Flow orchestration.
pub mod pipeline;
/// Run state machine and reports.
pub mod state;
/// External tool command lines.
pub mod tools;
/// Working directory lease and file layout.
pub mod workdir;

pub use config::{PipelineConfig, ToolsConfig};
pub use pipeline::{MineOutcome, Pipeline, PublishOutcome, SetupOutcome, VerifyOutcome};
pub use state::{Flow, RunReport, RunState};
pub use workdir::WorkDir;
