//! End-to-end checks of the `b3sum` binary: stdin/file input, `--length`, `--keyed` and
//! `--derive-key`, and the CLI-boundary error kinds.

use std::io::Write;
use std::process::{Command, Stdio};

fn b3sum() -> Command {
    Command::new(env!("CARGO_BIN_EXE_b3sum"))
}

fn run_with_stdin(args: &[&str], input: &[u8]) -> (bool, String, String) {
    let mut child = b3sum()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn b3sum");
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(input)
        .expect("failed to write stdin");
    let output = child.wait_with_output().expect("failed to wait on b3sum");
    (
        output.status.success(),
        String::from_utf8(output.stdout).expect("stdout is not UTF-8"),
        String::from_utf8(output.stderr).expect("stderr is not UTF-8"),
    )
}

#[test]
fn hashes_empty_stdin() {
    let (ok, stdout, _stderr) = run_with_stdin(&[], b"");
    assert!(ok);
    assert_eq!(
        stdout.trim(),
        "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
    );
}

#[test]
fn respects_length_flag() {
    let (ok, stdout, _stderr) = run_with_stdin(&["--length", "4"], b"");
    assert!(ok);
    assert_eq!(stdout.trim(), "af1349b9");
}

#[test]
fn keyed_mode_matches_library() {
    let key = b"whats the Elvish word for friend";
    let key_hex = hex::encode(key);
    let (ok, stdout, _stderr) = run_with_stdin(&["--keyed", &key_hex], b"hello");
    assert!(ok);
    let expected = hex::encode(blake3::keyed_hash(key, b"hello").as_bytes());
    assert_eq!(stdout.trim(), expected);
}

#[test]
fn derive_key_mode_matches_library() {
    let context = "BLAKE3 2019-12-27 16:29:52 test vectors context";
    let (ok, stdout, _stderr) = run_with_stdin(&["--derive-key", context], b"");
    assert!(ok);
    assert_eq!(
        stdout.trim(),
        "2cc39783c223154fea8dfb7c1b1660f2ac2dcbd1c1de8277b0b0dd39b7e50d7d"
    );
}

#[test]
fn rejects_short_key() {
    let (ok, _stdout, stderr) = run_with_stdin(&["--keyed", "abcd"], b"");
    assert!(!ok);
    assert!(stderr.contains("64 hex digits"), "stderr was: {stderr}");
}

#[test]
fn rejects_non_hex_key() {
    let bad_key = "z".repeat(64);
    let (ok, _stdout, stderr) = run_with_stdin(&["--keyed", &bad_key], b"");
    assert!(!ok);
    assert!(stderr.contains("not valid hex"), "stderr was: {stderr}");
}

#[test]
fn hashes_from_file_argument() {
    let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    file.write_all(b"hello from a file")
        .expect("failed to write temp file");

    let output = b3sum()
        .arg(file.path())
        .output()
        .expect("failed to run b3sum");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let expected = hex::encode(blake3::hash(b"hello from a file").as_bytes());
    assert_eq!(stdout.trim(), expected);
}

#[test]
fn reports_missing_file() {
    let output = b3sum()
        .arg("/nonexistent/path/to/nowhere")
        .output()
        .expect("failed to run b3sum");
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("nonexistent"), "stderr was: {stderr}");
}
