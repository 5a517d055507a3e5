//! Command lines for the external tools.

use crate::config::PipelineConfig;
use std::path::Path;
use vidproof_stage::{Expect, Invocation, Stage};

/// `extract-frame -f <offset> -c <count> --scale --input <src> --output <frames>`
pub fn extract_frames(cfg: &PipelineConfig, source: &str, frames: &Path) -> Invocation {
    Invocation::new(Stage::ExtractFrames, cfg.program(&cfg.tools.extract_frame))
        .arg("-f")
        .arg(cfg.frame_offset.to_string())
        .arg("-c")
        .arg(cfg.frame_count.to_string())
        .arg("--scale")
        .arg("--input")
        .arg(source)
        .arg("--output")
        .path_arg(frames)
        .expect(Expect::File(frames.to_path_buf()))
}

/// `rust-phash <frames> <hashes>`
pub fn perceptual_hash(cfg: &PipelineConfig, frames: &Path, hashes: &Path) -> Invocation {
    Invocation::new(Stage::PerceptualHash, cfg.program(&cfg.tools.phash))
        .path_arg(frames)
        .path_arg(hashes)
        .expect(Expect::File(hashes.to_path_buf()))
}

/// `zkptrans zkporchallenge <hashes>`; the challenge is printed on stdout.
pub fn challenge(cfg: &PipelineConfig, hashes: &Path) -> Invocation {
    Invocation::new(Stage::Challenge, cfg.program(&cfg.tools.zkp))
        .arg("zkporchallenge")
        .path_arg(hashes)
        .expect(Expect::Stdout)
}

/// `zkptrans zkporgenproof <crs> <proof> <hashes> <witness>`
pub fn generate_proof(
    cfg: &PipelineConfig,
    crs: &Path,
    proof: &Path,
    hashes: &Path,
    witness: &Path,
) -> Invocation {
    Invocation::new(Stage::GenerateProof, cfg.program(&cfg.tools.zkp))
        .arg("zkporgenproof")
        .path_arg(crs)
        .path_arg(proof)
        .path_arg(hashes)
        .path_arg(witness)
        .expect(Expect::File(proof.to_path_buf()))
}

/// `zkptrans zkporverify <crs> <proof> <public-inputs>`; verdict on stdout.
pub fn verify_proof(cfg: &PipelineConfig, crs: &Path, proof: &Path, inputs: &Path) -> Invocation {
    Invocation::new(Stage::VerifyProof, cfg.program(&cfg.tools.zkp))
        .arg("zkporverify")
        .path_arg(crs)
        .path_arg(proof)
        .path_arg(inputs)
        .expect(Expect::Stdout)
}

/// `zkptrans zkporsetup <crs>`
pub fn setup_crs(cfg: &PipelineConfig, crs: &Path) -> Invocation {
    Invocation::new(Stage::SetupCrs, cfg.program(&cfg.tools.zkp))
        .arg("zkporsetup")
        .path_arg(crs)
        .expect(Expect::File(crs.to_path_buf()))
}

/// Verdict printed by `zkporverify`, e.g. `Verificaiton result = true`.
///
/// The last line mentioning `result` (any case) decides; the value after `=`
/// or `:` must be `true` or `false`. Timing lines after it are ignored.
/// `None` when no such line exists.
#[must_use]
pub fn parse_verdict(stdout: &str) -> Option<bool> {
    stdout
        .lines()
        .rev()
        .filter(|l| l.to_ascii_lowercase().contains("result"))
        .find_map(|l| {
            let (_, value) = l.rsplit_once(['=', ':'])?;
            match value.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_uses_configured_window() {
        let cfg = PipelineConfig {
            frame_offset: 5,
            frame_count: 3,
            bin_dir: Some("/opt/bin".into()),
            ..PipelineConfig::default()
        };
        let inv = extract_frames(&cfg, "in.mp4", Path::new("/w/scaled-frames.txt"));
        assert_eq!(inv.program, Path::new("/opt/bin/extract-frame"));
        assert_eq!(
            inv.args,
            [
                "-f",
                "5",
                "-c",
                "3",
                "--scale",
                "--input",
                "in.mp4",
                "--output",
                "/w/scaled-frames.txt"
            ]
        );
    }

    #[test]
    fn verdict_is_read_from_the_result_line() {
        let engine = "loading crs\nVerificaiton result = true\nOnly Verification 12\nLoad Proof+Verification 40\n";
        assert_eq!(parse_verdict(engine), Some(true));
        assert_eq!(
            parse_verdict("Verificaiton result = false\nOnly Verification 9\n"),
            Some(false)
        );
        assert_eq!(parse_verdict("verify result: TRUE"), Some(true));
        assert_eq!(
            parse_verdict("result: true\nresult: false"),
            Some(false)
        );
    }

    #[test]
    fn missing_verdict_line_is_none() {
        assert_eq!(parse_verdict(""), None);
        assert_eq!(parse_verdict("true\nOnly Verification 12"), None);
        assert_eq!(parse_verdict("result = maybe"), None);
    }
}
