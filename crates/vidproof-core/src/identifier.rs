//! Agreement identifiers.
//!
//! `SHA-256(canonical agreement JSON)`, base64 URL-safe alphabet with `=`
//! padding. The ledger validates identifiers by recomputing this digest, so
//! both the preimage encoding and the base64 variant are fixed.

use crate::{Error, Result};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of the raw digest behind an identifier.
pub const DIGEST_LEN: usize = 32;

/// Join key between an agreement and the proofs committed against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlaId(String);

impl SlaId {
    /// Derive the identifier of a serialized agreement.
    #[must_use]
    pub fn derive(serialized_agreement: &[u8]) -> Self {
        let digest = Sha256::digest(serialized_agreement);
        Self(URL_SAFE.encode(digest))
    }

    /// Identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 32-byte digest.
    pub fn digest(&self) -> Result<[u8; DIGEST_LEN]> {
        let raw = URL_SAFE
            .decode(&self.0)
            .map_err(|_| Error::InvalidIdentifier(self.0.clone()))?;
        raw.try_into()
            .map_err(|_| Error::InvalidIdentifier(self.0.clone()))
    }
}

impl fmt::Display for SlaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SlaId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = Self(s.trim().to_owned());
        id.digest()?;
        Ok(id)
    }
}

impl TryFrom<String> for SlaId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SlaId> for String {
    fn from(id: SlaId) -> Self {
        id.0
    }
}

impl AsRef<str> for SlaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
