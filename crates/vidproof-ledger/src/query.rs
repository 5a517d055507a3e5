//! Decoding and classification of ledger query responses.

use serde::Deserialize;
use vidproof_core::{Agreement, Error, SlaId, ZkMerkleProof};

/// Marker the ledger CLI prints when a key has no record.
const NOT_FOUND_MARKER: &str = "not found";

/// One-field envelope returned by `q sla get`.
#[derive(Debug, Deserialize)]
struct SlaEnvelope {
    sla: String,
}

/// Decode a `q sla get` response into an agreement.
pub fn parse_sla_response(id: &SlaId, stdout: &str) -> Result<Agreement, Error> {
    let body = stdout.trim();
    if body.is_empty() {
        return Err(Error::AgreementNotFound { id: id.to_string() });
    }
    let envelope: SlaEnvelope = serde_json::from_str(body)
        .map_err(|e| Error::MalformedAgreement(format!("envelope: {e}")))?;
    if envelope.sla.trim().is_empty() {
        return Err(Error::AgreementNotFound { id: id.to_string() });
    }
    Agreement::parse(envelope.sla.as_bytes())
}

/// Decode a `q sla commit` response into a proof.
pub fn parse_commit_response(id: &SlaId, stdout: &str) -> Result<ZkMerkleProof, Error> {
    let body = stdout.trim();
    if body.is_empty() {
        return Err(Error::CommitNotFound { id: id.to_string() });
    }
    let proof = ZkMerkleProof::parse(body.as_bytes())?;
    if proof.is_empty() {
        return Err(Error::CommitNotFound { id: id.to_string() });
    }
    Ok(proof)
}

/// Map a failed query invocation onto the query error taxonomy.
pub fn classify_query_failure(id: &SlaId, what: &str, err: Error) -> Error {
    let id = id.to_string();
    match err {
        Error::StageExecution { ref stderr, .. }
            if stderr.to_ascii_lowercase().contains(NOT_FOUND_MARKER) =>
        {
            if what == "commit" {
                Error::CommitNotFound { id }
            } else {
                Error::AgreementNotFound { id }
            }
        }
        Error::StageExecution { exit, stderr, .. } => Error::LedgerQuery {
            id,
            reason: format!("{exit}: {}", stderr.trim()),
        },
        other => Error::LedgerQuery {
            id,
            reason: other.to_string(),
        },
    }
}
