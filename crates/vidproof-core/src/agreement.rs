//! Storage agreement (SLA) and the Merkle public input it commits to.
//!
//! An [`Agreement`] binds a content locator to a proof scheme and the
//! scheme-specific public inputs the prover produced at publish time. Its
//! canonical JSON form is what the ledger stores and what the identifier is
//! derived from; see [`crate::canonical`] for the exact encoding.
//!
//! **Invariant:** `proof_kind` decides how `public_inputs` is read. Callers go
//! through [`Agreement::merkle_public_input`] rather than decoding the string
//! themselves.

use crate::canonical::{to_canonical_string, to_canonical_vec};
use crate::identifier::SlaId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proof scheme an agreement is checked with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProofKind {
    /// Perceptual hashes committed in a Merkle tree, proven with a zk-SNARK.
    #[serde(rename = "PhashMerkleZksnark")]
    PhashMerkleZksnark,
    /// SSIM over sampled macroblocks, proven with a zk-SNARK.
    #[serde(rename = "SsimZksnark", alias = "SsimMerkleZksnark")]
    SsimMerkleZksnark,
}

impl ProofKind {
    /// Wire name as stored on the ledger.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PhashMerkleZksnark => "PhashMerkleZksnark",
            Self::SsimMerkleZksnark => "SsimZksnark",
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PhashMerkleZksnark" => Ok(Self::PhashMerkleZksnark),
            "SsimZksnark" | "SsimMerkleZksnark" => Ok(Self::SsimMerkleZksnark),
            other => Err(Error::MalformedAgreement(format!(
                "unknown proof kind `{other}`"
            ))),
        }
    }
}

/// A storage commitment record. Never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agreement {
    /// URI or path of the stored video.
    #[serde(rename = "Url")]
    pub source_locator: String,
    /// Scheme the content is proven with.
    #[serde(rename = "ProofType")]
    pub proof_kind: ProofKind,
    /// Opaque prover output; schema depends on `proof_kind`.
    #[serde(rename = "PublicInputs")]
    pub public_inputs: String,
}

impl Agreement {
    /// Construct a new agreement.
    #[must_use]
    pub fn new(
        source_locator: impl Into<String>,
        proof_kind: ProofKind,
        public_inputs: impl Into<String>,
    ) -> Self {
        Self {
            source_locator: source_locator.into(),
            proof_kind,
            public_inputs: public_inputs.into(),
        }
    }

    /// Canonical JSON bytes (the identifier preimage).
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        to_canonical_vec(self)
    }

    /// Canonical JSON as a string, as passed to the ledger CLI.
    pub fn to_canonical_json(&self) -> Result<String> {
        to_canonical_string(self)
    }

    /// Identifier of this agreement.
    pub fn identifier(&self) -> Result<SlaId> {
        Ok(SlaId::derive(&self.to_canonical_bytes()?))
    }

    /// Parse agreement JSON.
    ///
    /// Unknown keys are tolerated; a missing key or an unrecognized
    /// `ProofType` is [`Error::MalformedAgreement`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedAgreement(e.to_string()))
    }

    /// Decode `public_inputs` as a Merkle public input.
    ///
    /// Only [`ProofKind::PhashMerkleZksnark`] defines that schema.
    pub fn merkle_public_input(&self) -> Result<ZkPublicInput> {
        match self.proof_kind {
            ProofKind::PhashMerkleZksnark => ZkPublicInput::parse(self.public_inputs.as_bytes()),
            other => Err(Error::MalformedPublicInput(format!(
                "proof kind {other} carries no merkle public input"
            ))),
        }
    }
}

/// Merkle membership statement proven alongside the zk-SNARK.
///
/// All three fields are hex strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZkPublicInput {
    /// Challenged leaf.
    #[serde(alias = "Leaf")]
    pub leaf: String,
    /// Merkle root.
    #[serde(alias = "Root")]
    pub root: String,
    /// Packed authentication path.
    #[serde(alias = "Path")]
    pub auth_path: String,
}

impl ZkPublicInput {
    /// Parse and validate public input JSON.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let pi: Self = serde_json::from_slice(bytes)
            .map_err(|e| Error::MalformedPublicInput(e.to_string()))?;
        for (name, value) in [
            ("leaf", &pi.leaf),
            ("root", &pi.root),
            ("auth_path", &pi.auth_path),
        ] {
            hex::decode(value)
                .map_err(|e| Error::MalformedPublicInput(format!("{name}: {e}")))?;
        }
        Ok(pi)
    }

    /// Canonical JSON encoding.
    pub fn to_json(&self) -> Result<String> {
        to_canonical_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> Agreement {
        Agreement::new("out.ts", ProofKind::PhashMerkleZksnark, "C1")
    }

    #[test]
    fn canonical_form_is_pinned() {
        let json = scenario_a().to_canonical_json().unwrap();
        assert_eq!(
            json,
            r#"{"Url":"out.ts","ProofType":"PhashMerkleZksnark","PublicInputs":"C1"}"#
        );
    }

    #[test]
    fn parse_inverts_serialize() {
        let a = Agreement::new("/a.mp4", ProofKind::SsimMerkleZksnark, "{\"x\":\"<y>\"}");
        let back = Agreement::parse(&a.to_canonical_bytes().unwrap()).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn missing_proof_type_is_malformed() {
        let err = Agreement::parse(br#"{"Url":"x"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedAgreement(_)), "{err}");
    }

    #[test]
    fn unknown_proof_type_is_malformed() {
        let err =
            Agreement::parse(br#"{"Url":"x","ProofType":"Sha1","PublicInputs":""}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedAgreement(_)), "{err}");
    }

    #[test]
    fn ssim_alias_is_accepted_and_normalized() {
        let a = Agreement::parse(
            br#"{"Url":"x","ProofType":"SsimMerkleZksnark","PublicInputs":""}"#,
        )
        .unwrap();
        assert_eq!(a.proof_kind, ProofKind::SsimMerkleZksnark);
        assert!(a.to_canonical_json().unwrap().contains("\"SsimZksnark\""));
        assert_eq!("SsimMerkleZksnark".parse::<ProofKind>().unwrap(), a.proof_kind);
    }

    #[test]
    fn merkle_public_input_depends_on_kind() {
        let pi = ZkPublicInput {
            leaf: "0a".into(),
            root: "ff00".into(),
            auth_path: "".into(),
        };
        let a = Agreement::new("v", ProofKind::PhashMerkleZksnark, pi.to_json().unwrap());
        assert_eq!(a.merkle_public_input().unwrap(), pi);

        let s = Agreement::new("v", ProofKind::SsimMerkleZksnark, pi.to_json().unwrap());
        assert!(matches!(
            s.merkle_public_input(),
            Err(Error::MalformedPublicInput(_))
        ));
    }

    #[test]
    fn public_input_rejects_non_hex() {
        let err =
            ZkPublicInput::parse(br#"{"leaf":"zz","root":"00","auth_path":"00"}"#).unwrap_err();
        assert!(err.to_string().contains("leaf"));
    }
}
