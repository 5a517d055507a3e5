// crates/vidproof-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidproof_core::{io::read_agreement_json, SlaId};
use vidproof_pipeline::{Pipeline, PipelineConfig};
use vidproof_stage::{CancelToken, ProcessRunner};

#[derive(Parser, Debug)]
#[command(
    name = "vidproof",
    about = "Proof-of-storage pipeline for video content",
    long_about = "Proof-of-storage pipeline for video content.\n\nPublish storage agreements for a video, mine proofs against them, and audit committed proofs.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    cmd: Cmd,
}

/// Flags shared by every subcommand; each overrides the config file.
#[derive(clap::Args, Debug)]
struct GlobalOpts {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Working directory for intermediate files (one run at a time)
    #[arg(long, global = true)]
    work: Option<PathBuf>,

    /// Directory holding the external tools (default: PATH lookup)
    #[arg(long, global = true)]
    bin_dir: Option<PathBuf>,

    /// Account signing ledger transactions
    #[arg(long, global = true)]
    from: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Sample a video, derive its challenge and submit a storage agreement
    Publish {
        /// Source video to sample
        #[arg(long)]
        input: String,

        /// Locator the agreement names as the stored content
        #[arg(long)]
        output: String,
    },

    /// Prove storage for an agreement and commit the proof
    Mine {
        /// Agreement identifier
        #[arg(long)]
        sla: String,
    },

    /// Check the proof committed for an agreement
    Verify {
        /// Agreement identifier
        #[arg(long)]
        sla: String,
    },

    /// Produce the CRS parameter file
    Setup {
        /// Regenerate even if the file already exists
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Print an agreement recorded on the ledger
    ShowAgreement {
        /// Agreement identifier
        #[arg(long)]
        sla: String,
    },

    /// Print the size and digest of a committed proof
    ShowProof {
        /// Agreement identifier
        #[arg(long)]
        sla: String,
    },

    /// Compute the identifier of an agreement JSON file offline
    Identify {
        /// Agreement JSON file
        #[arg(long)]
        agreement: PathBuf,
    },
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let opts = &cli.global;
    match cli.cmd {
        Cmd::Publish { input, output } => publish(&open(opts)?, &input, &output),
        Cmd::Mine { sla } => mine(&open(opts)?, &parse_id(&sla)?),
        Cmd::Verify { sla } => verify(&open(opts)?, &parse_id(&sla)?),
        Cmd::Setup { force } => setup(&open(opts)?, force),
        Cmd::ShowAgreement { sla } => show_agreement(&open(opts)?, &parse_id(&sla)?),
        Cmd::ShowProof { sla } => show_proof(&open(opts)?, &parse_id(&sla)?),
        Cmd::Identify { agreement } => identify(&agreement).map(|()| ExitCode::SUCCESS),
    }
}

/// Pipeline over real processes, cancellable with Ctrl-C.
fn open(opts: &GlobalOpts) -> Result<Pipeline<ProcessRunner>> {
    let config = load_config(opts)?;
    let cancel = CancelToken::new();
    install_ctrlc(&cancel);
    let runner = ProcessRunner::new(cancel).with_poll_interval(config.poll_interval());
    Ok(Pipeline::new(config, runner))
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Trip `cancel` on Ctrl-C; the in-flight tool is killed and the run fails.
fn install_ctrlc(cancel: &CancelToken) {
    let token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("interrupt received, cancelling run");
        token.cancel();
    }) {
        warn!(error = %e, "cannot install Ctrl-C handler");
    }
}

/// Config file (if any) overlaid with command-line flags.
fn load_config(opts: &GlobalOpts) -> Result<PipelineConfig> {
    let mut config = match &opts.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(work) = &opts.work {
        config.work_dir.clone_from(work);
    }
    if let Some(dir) = &opts.bin_dir {
        config.bin_dir = Some(dir.clone());
    }
    if let Some(from) = &opts.from {
        config.signer.clone_from(from);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn parse_id(raw: &str) -> Result<SlaId> {
    raw.trim()
        .parse()
        .with_context(|| format!("`{raw}` is not an agreement identifier"))
}

fn publish(pipeline: &Pipeline<ProcessRunner>, input: &str, output: &str) -> Result<ExitCode> {
    info!(input, output, "publishing");
    let out = pipeline
        .publish(input, output)
        .with_context(|| format!("publishing {input}"))?;

    println!("Published agreement {}", out.identifier);
    println!("{}", out.agreement.to_canonical_json()?);
    Ok(ExitCode::SUCCESS)
}

fn mine(pipeline: &Pipeline<ProcessRunner>, id: &SlaId) -> Result<ExitCode> {
    info!(%id, "mining");
    let out = pipeline
        .mine(id)
        .with_context(|| format!("mining agreement {id}"))?;

    println!(
        "Committed proof for {} ({} bytes, sha256 {})",
        out.identifier,
        out.proof.len(),
        out.proof.digest_hex()
    );
    Ok(ExitCode::SUCCESS)
}

fn verify(pipeline: &Pipeline<ProcessRunner>, id: &SlaId) -> Result<ExitCode> {
    info!(%id, "verifying committed proof");
    let out = pipeline
        .verify(id)
        .with_context(|| format!("verifying agreement {id}"))?;

    if out.accepted {
        println!("OK: proof for {} verified (sha256 {})", out.identifier, out.proof_digest);
        Ok(ExitCode::SUCCESS)
    } else {
        println!("REJECTED: proof for {} did not verify", out.identifier);
        Ok(ExitCode::FAILURE)
    }
}

fn setup(pipeline: &Pipeline<ProcessRunner>, force: bool) -> Result<ExitCode> {
    let out = pipeline.setup(force).context("producing CRS")?;
    if out.created {
        println!("Wrote CRS → {}", out.crs.display());
    } else {
        println!("CRS already present at {} (use --force to regenerate)", out.crs.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn show_agreement(pipeline: &Pipeline<ProcessRunner>, id: &SlaId) -> Result<ExitCode> {
    let agreement = pipeline
        .ledger()
        .get_agreement(id)
        .with_context(|| format!("resolving agreement {id}"))?;

    println!("Url:          {}", agreement.source_locator);
    println!("ProofType:    {}", agreement.proof_kind);
    println!("PublicInputs: {}", agreement.public_inputs);
    match agreement.merkle_public_input() {
        Ok(pi) => println!("{}", serde_json::to_string_pretty(&pi)?),
        Err(e) => info!(error = %e, "public inputs not decoded"),
    }
    Ok(ExitCode::SUCCESS)
}

fn show_proof(pipeline: &Pipeline<ProcessRunner>, id: &SlaId) -> Result<ExitCode> {
    let proof = pipeline
        .ledger()
        .get_committed_proof(id)
        .with_context(|| format!("fetching proof committed for {id}"))?;

    println!("{} bytes, sha256 {}", proof.len(), proof.digest_hex());
    Ok(ExitCode::SUCCESS)
}

fn identify(path: &Path) -> Result<()> {
    let agreement = read_agreement_json(path)
        .with_context(|| format!("reading agreement {}", path.display()))?;
    let id = agreement.identifier()?;
    let stored = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    if String::from_utf8_lossy(&stored).trim().as_bytes() != agreement.to_canonical_bytes()?.as_slice() {
        warn!(path = %path.display(), "file is not in canonical form; identifier is of the canonical encoding");
    }
    println!("{id}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config_defaults() {
        let cli = Cli::try_parse_from([
            "vidproof",
            "--work",
            "/tmp/w",
            "--from",
            "alice",
            "mine",
            "--sla",
            "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU=",
        ])
        .unwrap();
        let cfg = load_config(&cli.global).unwrap();
        assert_eq!(cfg.work_dir, Path::new("/tmp/w"));
        assert_eq!(cfg.signer, "alice");
        assert_eq!(cfg.tools.zkp, "zkptrans");
    }

    #[test]
    fn bad_identifier_is_rejected() {
        assert!(parse_id("not an id").is_err());
        assert!(parse_id(" 47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU= ").is_ok());
    }

    #[test]
    fn identify_accepts_non_canonical_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sla.json");
        std::fs::write(
            &path,
            "{ \"PublicInputs\": \"C1\", \"Url\": \"out.ts\", \"ProofType\": \"PhashMerkleZksnark\" }\n",
        )
        .unwrap();
        identify(&path).unwrap();
        assert!(identify(&dir.path().join("missing.json")).is_err());
    }
}
