//! vidproof-core — agreement model, wire encoding and errors.
//!
//! This crate defines the **stable boundary** between the pipeline and the
//! ledger:
//! - the storage agreement ([`Agreement`]) and its proof scheme ([`ProofKind`]),
//! - the committed proof ([`ZkMerkleProof`]) and Merkle public input
//!   ([`ZkPublicInput`]),
//! - the canonical JSON encoding the ledger re-hashes, and
//! - identifier derivation ([`SlaId`]).
//!
//! ```
//! use vidproof_core::{Agreement, ProofKind};
//!
//! let sla = Agreement::new("out.ts", ProofKind::PhashMerkleZksnark, "C1");
//! let id = sla.identifier()?;
//! assert_eq!(id, sla.identifier()?);
//! # Ok::<(), vidproof_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Storage agreement, proof kinds and Merkle public inputs.
pub mod agreement;
/// Canonical JSON encoding shared with the ledger.
pub mod canonical;
/// Error taxonomy.
pub mod error;
/// Agreement identifier derivation.
pub mod identifier;
/// File helpers for agreements, proofs and public inputs.
pub mod io;
/// Committed proof blob.
pub mod proof;

pub use agreement::*;
pub use error::*;
pub use identifier::*;
pub use proof::*;

/// Commonly-used items for quick imports.
pub mod prelude {
    pub use crate::{
        agreement::{Agreement, ProofKind, ZkPublicInput},
        error::{Error, Result},
        identifier::SlaId,
        proof::ZkMerkleProof,
    };
}
