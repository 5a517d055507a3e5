//! The flows: publish, mine, verify and setup.
//!
//! Each flow is a fixed sequence of stages over a leased [`WorkDir`]. A stage
//! starts only after the previous one exited and its output was checked. The
//! publish and mine flows issue exactly one ledger transaction, as their last
//! step, so a failure anywhere upstream leaves the ledger untouched.

use crate::config::PipelineConfig;
use crate::state::{Flow, Run, RunReport, RunState};
use crate::tools;
use crate::workdir::WorkDir;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};
use vidproof_core::{io, Agreement, Error, ProofKind, Result, SlaId, ZkMerkleProof, PROOF_LEN};
use vidproof_ledger::LedgerClient;
use vidproof_stage::{artifact, Stage, StageRunner};

/// Result of a publish run.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    /// Agreement submitted to the ledger.
    pub agreement: Agreement,
    /// Its identifier.
    pub identifier: SlaId,
    /// Run history.
    pub report: RunReport,
}

/// Result of a mine run.
#[derive(Debug, Clone)]
pub struct MineOutcome {
    /// Agreement the proof was committed against.
    pub identifier: SlaId,
    /// Committed proof.
    pub proof: ZkMerkleProof,
    /// Run history.
    pub report: RunReport,
}

/// Result of a verify run.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    /// Audited agreement.
    pub identifier: SlaId,
    /// Whether the proving engine accepted the committed proof.
    pub accepted: bool,
    /// SHA-256 (hex) of the committed proof blob.
    pub proof_digest: String,
    /// Run history.
    pub report: RunReport,
}

/// Result of a setup run.
#[derive(Debug, Clone)]
pub struct SetupOutcome {
    /// CRS parameter file.
    pub crs: PathBuf,
    /// False when an existing file was kept.
    pub created: bool,
    /// Run history.
    pub report: RunReport,
}

/// Orchestrates the flows with `runner` executing every external call.
#[derive(Debug)]
pub struct Pipeline<R> {
    config: PipelineConfig,
    runner: R,
    last: Mutex<Option<RunReport>>,
}

impl<R: StageRunner> Pipeline<R> {
    /// Pipeline over `config`.
    pub const fn new(config: PipelineConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            last: Mutex::new(None),
        }
    }

    /// Report of the most recent run, successful or failed.
    pub fn last_report(&self) -> Option<RunReport> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, report: &RunReport) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
    }

    fn succeed(&self, run: Run) -> RunReport {
        let report = run.finish();
        self.record(&report);
        report
    }

    fn abort(&self, run: Run, err: Error) -> Error {
        self.record(&run.fail(&err));
        err
    }

    /// Active configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ledger client sharing this pipeline's runner.
    pub fn ledger(&self) -> LedgerClient<&R> {
        LedgerClient::new(
            &self.runner,
            self.config.program(&self.config.tools.ledger),
            self.config.signer.clone(),
        )
    }

    /// Sample `source`, hash it, request a challenge and submit the
    /// resulting agreement for `target`.
    pub fn publish(&self, source: &str, target: &str) -> Result<PublishOutcome> {
        if source.trim().is_empty() || target.trim().is_empty() {
            return Err(Error::Config("publish needs an input and an output locator".into()));
        }
        let (work, mut run) = self.begin(Flow::Publish)?;
        match self.publish_in(&work, &mut run, source, target) {
            Ok((agreement, identifier)) => Ok(PublishOutcome {
                agreement,
                identifier,
                report: self.succeed(run),
            }),
            Err(e) => Err(self.abort(run, e)),
        }
    }

    fn publish_in(
        &self,
        work: &WorkDir,
        run: &mut Run,
        source: &str,
        target: &str,
    ) -> Result<(Agreement, SlaId)> {
        self.sample_and_hash(work, run, source)?;

        run.advance(RunState::Challenging);
        // Checked for blankness only; the payload is opaque and hashed as printed.
        let out = artifact::execute(&self.runner, &tools::challenge(&self.config, &work.hashes()))?;
        let agreement = Agreement::new(target, ProofKind::PhashMerkleZksnark, out.stdout_text());
        let identifier = agreement.identifier()?;
        io::write_agreement_json(work.agreement(), &agreement)?;
        info!(id = %identifier, target, "agreement constructed");

        run.advance(RunState::Submitting);
        self.ledger()
            .create_sla(&self.config.reward, &identifier, &agreement)?;
        Ok((agreement, identifier))
    }

    /// Prove storage of the video behind agreement `id` and commit the proof.
    pub fn mine(&self, id: &SlaId) -> Result<MineOutcome> {
        let (work, mut run) = self.begin(Flow::Mine)?;
        match self.mine_in(&work, &mut run, id) {
            Ok(proof) => Ok(MineOutcome {
                identifier: id.clone(),
                proof,
                report: self.succeed(run),
            }),
            Err(e) => Err(self.abort(run, e)),
        }
    }

    fn mine_in(&self, work: &WorkDir, run: &mut Run, id: &SlaId) -> Result<ZkMerkleProof> {
        let crs = self.require_crs()?;

        run.advance(RunState::Resolving);
        let agreement = self.ledger().get_agreement(id)?;
        if agreement.proof_kind != ProofKind::PhashMerkleZksnark {
            warn!(%id, kind = %agreement.proof_kind, "agreement is not a phash proof; proving anyway");
        }
        self.sample_and_hash(work, run, &agreement.source_locator)?;

        run.advance(RunState::Proving);
        artifact::execute(
            &self.runner,
            &tools::generate_proof(
                &self.config,
                &crs,
                &work.proof(),
                &work.hashes(),
                &work.witness(),
            ),
        )?;
        let proof = ZkMerkleProof::new(io::read_proof_blob(work.proof())?);
        if !proof.has_expected_len() {
            warn!(len = proof.len(), expected = PROOF_LEN, "unexpected proof size");
        }

        run.advance(RunState::Submitting);
        self.ledger().commit_proof(id, &proof)?;
        Ok(proof)
    }

    /// Check the proof committed for `id` against the agreement's public inputs.
    ///
    /// Never touches ledger state.
    pub fn verify(&self, id: &SlaId) -> Result<VerifyOutcome> {
        let (work, mut run) = self.begin(Flow::Verify)?;
        match self.verify_in(&work, &mut run, id) {
            Ok((accepted, proof_digest)) => Ok(VerifyOutcome {
                identifier: id.clone(),
                accepted,
                proof_digest,
                report: self.succeed(run),
            }),
            Err(e) => Err(self.abort(run, e)),
        }
    }

    fn verify_in(&self, work: &WorkDir, run: &mut Run, id: &SlaId) -> Result<(bool, String)> {
        let crs = self.require_crs()?;

        run.advance(RunState::Resolving);
        let ledger = self.ledger();
        let public_input = ledger.get_agreement(id)?.merkle_public_input()?;
        let proof = ledger.get_committed_proof(id)?;
        io::write_bytes(work.committed_proof(), proof.bytes())?;
        io::write_public_input_json(work.public_inputs(), &public_input)?;

        run.advance(RunState::Verifying);
        let out = artifact::execute(
            &self.runner,
            &tools::verify_proof(
                &self.config,
                &crs,
                &work.committed_proof(),
                &work.public_inputs(),
            ),
        )?;
        let accepted = tools::parse_verdict(&out.stdout_text()).ok_or_else(|| Error::ArtifactMissing {
            stage: Stage::VerifyProof.as_str(),
            artifact: "verdict line on stdout".to_owned(),
        })?;
        info!(%id, accepted, "verification finished");
        Ok((accepted, proof.digest_hex()))
    }

    /// Produce the CRS file; an existing non-empty file is kept unless `force`.
    pub fn setup(&self, force: bool) -> Result<SetupOutcome> {
        let (_work, mut run) = self.begin(Flow::Setup)?;
        let crs = self.config.crs_path();
        if !force && non_empty(&crs) {
            info!(crs = %crs.display(), "CRS already present, keeping it");
            return Ok(SetupOutcome {
                crs,
                created: false,
                report: self.succeed(run),
            });
        }

        run.advance(RunState::Proving);
        let result = ensure_parent(&crs)
            .and_then(|()| artifact::execute(&self.runner, &tools::setup_crs(&self.config, &crs)));
        match result {
            Ok(_) => Ok(SetupOutcome {
                crs,
                created: true,
                report: self.succeed(run),
            }),
            Err(e) => Err(self.abort(run, e)),
        }
    }

    fn begin(&self, flow: Flow) -> Result<(WorkDir, Run)> {
        self.config.validate()?;
        let work = WorkDir::acquire(&self.config.work_dir)?;
        Ok((work, Run::start(flow)))
    }

    fn sample_and_hash(&self, work: &WorkDir, run: &mut Run, source: &str) -> Result<()> {
        run.advance(RunState::Extracting);
        artifact::execute(
            &self.runner,
            &tools::extract_frames(&self.config, source, &work.frames()),
        )?;

        run.advance(RunState::Hashing);
        artifact::execute(
            &self.runner,
            &tools::perceptual_hash(&self.config, &work.frames(), &work.hashes()),
        )?;
        Ok(())
    }

    fn require_crs(&self) -> Result<PathBuf> {
        let crs = self.config.crs_path();
        if non_empty(&crs) {
            Ok(crs)
        } else {
            Err(Error::Config(format!(
                "CRS file {} is missing or empty; run setup first",
                crs.display()
            )))
        }
    }
}

fn non_empty(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("create {}", dir.display()), e)),
        _ => Ok(()),
    }
}
