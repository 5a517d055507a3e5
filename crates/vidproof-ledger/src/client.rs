//! Ledger client over the ledger's command-line tool.
//!
//! Transactions (`createSla`, `commitProof`) only need a clean exit; the
//! receipt is not parsed. Queries are read back from standard output and
//! classified into "not there" versus "could not ask".

use crate::query::{classify_query_failure, parse_commit_response, parse_sla_response};
use std::path::PathBuf;
use tracing::{info, warn};
use vidproof_core::{Agreement, Error, Result, SlaId, ZkMerkleProof};
use vidproof_stage::{artifact, Invocation, Stage, StageRunner};

/// Default ledger CLI program name.
pub const DEFAULT_LEDGER_PROGRAM: &str = "ledger-cli";

/// Default reward attached to a new agreement.
pub const DEFAULT_REWARD: &str = "1vid";

/// Default signing account.
pub const DEFAULT_SIGNER: &str = "tester0";

/// Talks to the ledger through `runner`.
#[derive(Debug, Clone)]
pub struct LedgerClient<R> {
    runner: R,
    program: PathBuf,
    signer: String,
}

impl<R: StageRunner> LedgerClient<R> {
    /// Client running `program` and signing transactions as `signer`.
    pub fn new(runner: R, program: impl Into<PathBuf>, signer: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            signer: signer.into(),
        }
    }

    /// Signing account.
    #[must_use]
    pub fn signer(&self) -> &str {
        &self.signer
    }

    /// `tx sla createSla <reward> <id> <agreement-json> --yes --from <signer>`
    pub fn create_invocation(
        &self,
        reward: &str,
        id: &SlaId,
        agreement: &Agreement,
    ) -> Result<Invocation> {
        Ok(Invocation::new(Stage::LedgerCreate, &self.program)
            .args(["tx", "sla", "createSla", reward, id.as_str()])
            .arg(agreement.to_canonical_json()?)
            .args(["--yes", "--from", self.signer.as_str()]))
    }

    /// `tx sla commitProof <id> <proof-json> --yes --from <signer>`
    pub fn commit_invocation(&self, id: &SlaId, proof: &ZkMerkleProof) -> Result<Invocation> {
        Ok(Invocation::new(Stage::LedgerCommit, &self.program)
            .args(["tx", "sla", "commitProof", id.as_str()])
            .arg(proof.to_json()?)
            .args(["--yes", "--from", self.signer.as_str()]))
    }

    /// Submit a new agreement with `reward`.
    pub fn create_sla(&self, reward: &str, id: &SlaId, agreement: &Agreement) -> Result<()> {
        let inv = self.create_invocation(reward, id, agreement)?;
        artifact::execute(&self.runner, &inv)?;
        info!(%id, reward, signer = %self.signer, "agreement submitted");
        Ok(())
    }

    /// Commit `proof` against agreement `id`.
    pub fn commit_proof(&self, id: &SlaId, proof: &ZkMerkleProof) -> Result<()> {
        let inv = self.commit_invocation(id, proof)?;
        artifact::execute(&self.runner, &inv)?;
        info!(%id, proof_len = proof.len(), signer = %self.signer, "proof committed");
        Ok(())
    }

    /// Resolve agreement `id`.
    ///
    /// The ledger answers with `{"sla": "<agreement json>"}`.
    pub fn get_agreement(&self, id: &SlaId) -> Result<Agreement> {
        let stdout = self.query(id, "get")?;
        let agreement = parse_sla_response(id, &stdout)?;
        match agreement.identifier() {
            Ok(recomputed) if recomputed != *id => {
                warn!(%id, %recomputed, "agreement does not hash to its identifier");
            }
            Ok(_) => {}
            Err(e) => warn!(%id, error = %e, "cannot re-encode resolved agreement"),
        }
        Ok(agreement)
    }

    /// Fetch the proof committed against `id`.
    pub fn get_committed_proof(&self, id: &SlaId) -> Result<ZkMerkleProof> {
        let stdout = self.query(id, "commit")?;
        let proof = parse_commit_response(id, &stdout)?;
        if !proof.has_expected_len() {
            warn!(%id, len = proof.len(), "committed proof has unexpected size");
        }
        Ok(proof)
    }

    fn query(&self, id: &SlaId, what: &str) -> Result<String> {
        let inv = Invocation::new(Stage::LedgerQuery, &self.program)
            .args(["q", "sla", what, id.as_str()]);
        match self.runner.run(&inv) {
            Ok(out) => Ok(out.stdout_text()),
            Err(e @ Error::Cancelled { .. }) => Err(e),
            Err(e) => Err(classify_query_failure(id, what, e)),
        }
    }
}
