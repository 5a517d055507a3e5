//! Pipeline configuration: a TOML file layered under CLI overrides.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.
//!
//! ```toml
//! work_dir = "/srv/vidproof"
//! bin_dir = "/opt/vidproof/bin"
//! signer = "tester0"
//! frame_count = 300
//!
//! [tools]
//! ledger = "ledger-cli"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vidproof_core::{Error, Result};
use vidproof_ledger::{DEFAULT_LEDGER_PROGRAM, DEFAULT_REWARD, DEFAULT_SIGNER};

/// Default CRS file name inside the working directory.
pub const CRS_FILE: &str = "zkpor_crs.dat";

/// Program names of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Frame sampler.
    pub extract_frame: String,
    /// Perceptual hasher.
    pub phash: String,
    /// Proving engine (challenge, setup, prove, verify).
    pub zkp: String,
    /// Ledger command-line client.
    pub ledger: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            extract_frame: "extract-frame".into(),
            phash: "rust-phash".into(),
            zkp: "zkptrans".into(),
            ledger: DEFAULT_LEDGER_PROGRAM.into(),
        }
    }
}

/// Everything a flow needs besides its per-run inputs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Scratch directory holding intermediate files (one run at a time).
    pub work_dir: PathBuf,
    /// Directory the tools live in; `PATH` lookup when unset.
    pub bin_dir: Option<PathBuf>,
    /// Account signing ledger transactions.
    pub signer: String,
    /// Reward attached to new agreements.
    pub reward: String,
    /// First frame to sample.
    pub frame_offset: u32,
    /// Number of frames to sample.
    pub frame_count: u32,
    /// CRS parameter file; `<work_dir>/zkpor_crs.dat` when unset.
    pub crs_file: Option<PathBuf>,
    /// Cancellation poll interval while a tool runs.
    pub poll_interval_ms: u64,
    /// Tool program names.
    pub tools: ToolsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            bin_dir: None,
            signer: DEFAULT_SIGNER.into(),
            reward: DEFAULT_REWARD.into(),
            frame_offset: 0,
            frame_count: 300,
            crs_file: None,
            poll_interval_ms: 100,
            tools: ToolsConfig::default(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    home::home_dir().map_or_else(|| PathBuf::from("test"), |h| h.join("test"))
}

impl PipelineConfig {
    /// Parse TOML text.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        toml::from_str(src).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("read config {}", path.display()), e))?;
        toml::from_str(&src).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.frame_count == 0 {
            return Err(Error::Config("frame_count must be positive".into()));
        }
        if self.signer.trim().is_empty() {
            return Err(Error::Config("signer must not be empty".into()));
        }
        if self.reward.trim().is_empty() {
            return Err(Error::Config("reward must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// Resolve a tool name against `bin_dir`.
    #[must_use]
    pub fn program(&self, name: &str) -> PathBuf {
        self.bin_dir
            .as_ref()
            .map_or_else(|| PathBuf::from(name), |dir| dir.join(name))
    }

    /// CRS parameter file.
    #[must_use]
    pub fn crs_path(&self) -> PathBuf {
        self.crs_file
            .clone()
            .unwrap_or_else(|| self.work_dir.join(CRS_FILE))
    }

    /// Cancellation poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.signer, "tester0");
        assert_eq!(cfg.reward, "1vid");
        assert_eq!(cfg.frame_count, 300);
        assert_eq!(cfg.tools.ledger, "ledger-cli");
        assert!(cfg.work_dir.ends_with("test"));
        assert_eq!(cfg.crs_path(), cfg.work_dir.join(CRS_FILE));
        cfg.validate().unwrap();
    }

    #[test]
    fn bin_dir_prefixes_tools() {
        let cfg = PipelineConfig::from_toml_str(
            "bin_dir = \"/opt/bin\"\n[tools]\nzkp = \"zkptrans-v2\"\n",
        )
        .unwrap();
        assert_eq!(cfg.program(&cfg.tools.zkp), Path::new("/opt/bin/zkptrans-v2"));
        assert_eq!(cfg.tools.phash, "rust-phash");
        let bare = PipelineConfig::default();
        assert_eq!(bare.program("rust-phash"), Path::new("rust-phash"));
    }

    #[test]
    fn unknown_keys_and_bad_values_are_config_errors() {
        assert!(matches!(
            PipelineConfig::from_toml_str("wrok_dir = \"/x\""),
            Err(Error::Config(_))
        ));
        let cfg = PipelineConfig::from_toml_str("frame_count = 0").unwrap();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}
