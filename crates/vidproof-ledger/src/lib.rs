//! vidproof-ledger — the ledger as seen through its CLI.
//!
//! Two kinds of calls:
//! - **queries** resolve an agreement or a committed proof by identifier
//!   ([`LedgerClient::get_agreement`], [`LedgerClient::get_committed_proof`]);
//! - **transactions** create an agreement or commit a proof
//!   ([`LedgerClient::create_sla`], [`LedgerClient::commit_proof`]).
//!
//! Both go through a [`vidproof_stage::StageRunner`], so the same client runs
//! against the real CLI or a scripted runner in tests.

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

/// Ledger client (queries and transactions).
pub mod client;
/// Response decoding and failure classification.
pub mod query;

pub use client::{LedgerClient, DEFAULT_LEDGER_PROGRAM, DEFAULT_REWARD, DEFAULT_SIGNER};
