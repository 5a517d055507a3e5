//! Child-process runner behavior against real `/bin/sh` scripts.
#![cfg(unix)]
#![deny(rust_2018_idioms)]

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use vidproof_core::{Error, Exit};
use vidproof_stage::{artifact, CancelToken, Expect, Invocation, ProcessRunner, Stage, StageRunner};

/// Write a shell script; it is run through `/bin/sh` so it never needs the exec bit.
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, format!("#!/bin/sh\n{body}\n")).unwrap();
    p
}

fn sh(stage: Stage, script: &Path) -> Invocation {
    Invocation::new(stage, "/bin/sh").path_arg(script)
}

#[test]
fn missing_binary_is_a_launch_error() {
    let inv = Invocation::new(Stage::ExtractFrames, "/nonexistent/extract-frame").arg("-f");
    let err = ProcessRunner::default().run(&inv).unwrap_err();
    match err {
        Error::StageLaunch { stage, program, .. } => {
            assert_eq!(stage, "extract-frames");
            assert_eq!(program, "/nonexistent/extract-frame");
        }
        other => panic!("expected launch error, got {other}"),
    }
}

#[test]
fn non_executable_file_is_a_launch_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("rust-phash");
    std::fs::write(&p, "not a program").unwrap();
    let err = ProcessRunner::default()
        .run(&Invocation::new(Stage::PerceptualHash, &p))
        .unwrap_err();
    assert!(matches!(err, Error::StageLaunch { .. }), "{err}");
}

#[test]
fn non_zero_exit_carries_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let s = script(dir.path(), "fail.sh", "echo 'Could not open codec' >&2\nexit 3");
    let inv = sh(Stage::ExtractFrames, &s).arg("--input").arg("v.mp4");
    let err = ProcessRunner::default().run(&inv).unwrap_err();
    match err {
        Error::StageExecution {
            stage,
            args,
            exit,
            stderr,
            ..
        } => {
            assert_eq!(stage, "extract-frames");
            assert_eq!(exit, Exit::Code(3));
            assert!(args.ends_with(&["--input".to_owned(), "v.mp4".to_owned()]));
            assert!(stderr.contains("Could not open codec"));
        }
        other => panic!("expected execution error, got {other}"),
    }
}

#[test]
fn large_diagnostic_output_does_not_block() {
    let dir = tempfile::tempdir().unwrap();
    // Far beyond any pipe buffer, on both streams.
    let s = script(
        dir.path(),
        "chatty.sh",
        "head -c 1048576 /dev/zero | tr '\\000' e >&2\nhead -c 262144 /dev/zero | tr '\\000' o\nexit 0",
    );
    let out = ProcessRunner::default()
        .run(&sh(Stage::PerceptualHash, &s))
        .unwrap();
    assert_eq!(out.stderr.len(), 1_048_576);
    assert_eq!(out.stdout.len(), 262_144);
}

#[test]
fn stdout_is_captured() {
    let dir = tempfile::tempdir().unwrap();
    let s = script(dir.path(), "challenge.sh", "printf 'C1\\n'");
    let inv = sh(Stage::Challenge, &s).expect(Expect::Stdout);
    let out = artifact::execute(&ProcessRunner::default(), &inv).unwrap();
    assert_eq!(out.stdout_text(), "C1\n");
}

#[test]
fn clean_exit_without_declared_file_is_artifact_missing() {
    let dir = tempfile::tempdir().unwrap();
    let s = script(dir.path(), "lazy.sh", "exit 0");
    let out_file = dir.path().join("phashes.txt");
    let inv = sh(Stage::PerceptualHash, &s).expect(Expect::File(out_file));
    let err = artifact::execute(&ProcessRunner::default(), &inv).unwrap_err();
    assert!(
        matches!(err, Error::ArtifactMissing { stage: "perceptual-hash", .. }),
        "{err}"
    );
}

#[test]
fn declared_file_written_by_the_tool_passes() {
    let dir = tempfile::tempdir().unwrap();
    let out_file = dir.path().join("phashes.txt");
    let s = script(
        dir.path(),
        "hash.sh",
        &format!("printf 'h1\\nh2\\nh3\\n' > '{}'", out_file.display()),
    );
    let inv = sh(Stage::PerceptualHash, &s).expect(Expect::File(out_file.clone()));
    artifact::execute(&ProcessRunner::default(), &inv).unwrap();
    assert_eq!(std::fs::read_to_string(out_file).unwrap(), "h1\nh2\nh3\n");
}

#[test]
fn cancellation_terminates_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let s = script(dir.path(), "slow.sh", "exec sleep 30");
    let token = CancelToken::new();
    let runner = ProcessRunner::new(token.clone()).with_poll_interval(Duration::from_millis(20));

    let trip = token.clone();
    let t = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        trip.cancel();
    });

    let started = Instant::now();
    let err = runner.run(&sh(Stage::GenerateProof, &s)).unwrap_err();
    t.join().unwrap();
    assert!(matches!(err, Error::Cancelled { stage: "generate-proof" }), "{err}");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn background_grandchild_holding_the_pipe_stays_cancellable() {
    let dir = tempfile::tempdir().unwrap();
    // The tool exits at once but leaves a child with its stdout open.
    let s = script(dir.path(), "detach.sh", "sleep 30 &\nexit 0");
    let token = CancelToken::new();
    let runner = ProcessRunner::new(token.clone()).with_poll_interval(Duration::from_millis(20));

    let trip = token.clone();
    let t = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        trip.cancel();
    });

    let started = Instant::now();
    let err = runner.run(&sh(Stage::PerceptualHash, &s)).unwrap_err();
    t.join().unwrap();
    assert!(matches!(err, Error::Cancelled { stage: "perceptual-hash" }), "{err}");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn cancelled_token_prevents_launch() {
    let token = CancelToken::new();
    token.cancel();
    let err = ProcessRunner::new(token)
        .run(&Invocation::new(Stage::LedgerCommit, "/bin/true"))
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { stage: "ledger-commit" }));
}
