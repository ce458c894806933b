//! Runs the built binary in file mode and with piped standard input.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use pretty_assertions::assert_eq;

fn binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_minischeme"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Write `contents` to a per-test file in the system temp directory.
fn source_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("minischeme-{}-{}.scm", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

fn run_piped(input: &str) -> Output {
    let mut child = binary()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn file_mode_prints_each_result() {
    let path = source_file("ok", "(define x 10)\n(* x x)\n((lambda (a b) (- a b)) 5 7)\n");
    let output = binary().arg(&path).output().unwrap();
    std::fs::remove_file(&path).ok();

    assert!(output.status.success());
    assert_eq!(stdout(&output), "()\n100\n-2\n");
}

#[test]
fn file_mode_stops_at_first_fault() {
    let path = source_file("fault", "(+ 1 2)\n(/ 1 0)\n(+ 3 4)\n");
    let output = binary().arg(&path).output().unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "3\n");
    assert!(stderr(&output).contains("division by zero"));
}

#[test]
fn missing_file_is_an_error() {
    let output = binary().arg("/nonexistent/minischeme/input.scm").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("Error: cannot read"));
}

#[test]
fn extra_arguments_print_usage() {
    let output = binary().args(["a.scm", "b.scm"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Usage:"));
    assert!(output.stdout.is_empty());
}

#[test]
fn piped_repl_continues_after_errors() {
    let output = run_piped("(+ 1 2)\n(foo)\n(define sq\n  (lambda (x) (* x x)))\n(sq 9)\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "3\n()\n81\n");
    assert!(stderr(&output).contains("Error: unbound variable 'foo'"));
}

#[test]
fn piped_repl_reports_unterminated_input_at_end() {
    let output = run_piped("(+ 1 2)\n(+ 1\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "3\n");
    assert!(stderr(&output).contains("Error: malformed syntax: unterminated list"));
}

#[test]
fn invalid_configuration_is_rejected() {
    let output = binary()
        .env("MINISCHEME_HEAP_CAPACITY", "plenty")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("MINISCHEME_HEAP_CAPACITY"));
}
