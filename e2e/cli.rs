//! E2E: the compiled `duckforth` binary, invoked as a subprocess.
//!
//! Unlike `scenarios.rs`/`block_device.rs`, this drives the actual CLI
//! surface (`--no-repl`, `--blocks`, script loading) rather than the
//! library API directly.

use std::io::Write;
use std::process::{Command, Stdio};

fn duckforth() -> Command {
    Command::new(env!("CARGO_BIN_EXE_duckforth"))
}

#[test]
fn runs_a_script_file_and_exits_without_a_repl() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("square.fs");
    std::fs::write(&script, ": SQUARE DUP * ; 6 SQUARE .\n").unwrap();

    let output = duckforth()
        .arg(&script)
        .arg("--no-repl")
        .stdin(Stdio::null())
        .output()
        .expect("spawn duckforth");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "36 ");
}

#[test]
fn blocks_flag_persists_edits_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let blocks = dir.path().join("blocks.img");
    let script = dir.path().join("write_block.fs");
    std::fs::write(&script, "1 BUFFER DROP 42 1 BLOCK ! 1 BLOCK UPDATE FLUSH\n").unwrap();

    let write = duckforth()
        .arg(&script)
        .arg("--blocks")
        .arg(&blocks)
        .arg("--no-repl")
        .stdin(Stdio::null())
        .output()
        .expect("spawn duckforth");
    assert!(write.status.success(), "stderr: {}", String::from_utf8_lossy(&write.stderr));

    let read_script = dir.path().join("read_block.fs");
    std::fs::write(&read_script, "1 BLOCK @ .\n").unwrap();
    let read = duckforth()
        .arg(&read_script)
        .arg("--blocks")
        .arg(&blocks)
        .arg("--no-repl")
        .stdin(Stdio::null())
        .output()
        .expect("spawn duckforth");
    assert!(read.status.success(), "stderr: {}", String::from_utf8_lossy(&read.stderr));
    assert_eq!(String::from_utf8_lossy(&read.stdout), "42 ");
}

#[test]
fn closing_stdin_immediately_exits_cleanly_with_no_script() {
    let mut child = duckforth()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn duckforth");
    child.stdin.take().unwrap().write_all(b"").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn an_undefined_word_on_stdin_is_reported_but_not_fatal() {
    let mut child = duckforth()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn duckforth");
    child.stdin.take().unwrap().write_all(b"BOGUSWORD\n3 4 + .\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains('7'));
}
