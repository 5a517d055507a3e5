//! Committed zk-SNARK proof.
//!
//! [`ZkMerkleProof`] wraps the opaque blob the proving engine writes. The
//! ledger and the verifier interpret it against the public inputs of the
//! agreement it is committed to; nothing here looks inside it.
//!
//! On the wire the blob travels as standard (padded) base64 under the key
//! `proof`. The legacy capitalized key `Proof` is accepted when parsing.

use crate::canonical::to_canonical_string;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Size of a proof blob produced by the proving engine.
pub const PROOF_LEN: usize = 192;

/// Proof committed against an agreement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZkMerkleProof {
    /// Raw proof bytes.
    #[serde(alias = "Proof", with = "b64")]
    pub proof: Vec<u8>,
}

impl ZkMerkleProof {
    /// Wrap raw proof bytes.
    #[inline]
    #[must_use]
    pub fn new(proof: Vec<u8>) -> Self {
        Self { proof }
    }

    /// Proof bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.proof
    }

    /// Length of the blob.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.proof.len()
    }

    /// Whether the blob is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proof.is_empty()
    }

    /// Whether the blob has the size the proving engine emits.
    #[inline]
    #[must_use]
    pub fn has_expected_len(&self) -> bool {
        self.proof.len() == PROOF_LEN
    }

    /// Hex SHA-256 of the blob, for logs and operator output.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.proof))
    }

    /// Canonical JSON encoding, as passed to the ledger CLI.
    pub fn to_json(&self) -> Result<String> {
        to_canonical_string(self)
    }

    /// Parse proof JSON.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedProof(e.to_string()))
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD
            .decode(text.trim())
            .map_err(|e| D::Error::custom(format!("proof is not base64: {e}")))
    }
}
