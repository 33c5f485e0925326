// Integration tests for the `tabula` binary: file lifecycle, evaluation,
// search, sort, and clipboard-shaped paste.
// Run with: cargo test -p tabula-cli --test cli_tests

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn tabula() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tabula"))
}

fn sheet_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("test.sheet")
}

fn new_sheet(dir: &tempfile::TempDir) -> PathBuf {
    let path = sheet_path(dir);
    let status = tabula()
        .args(["new", path.to_str().unwrap()])
        .status()
        .expect("tabula new");
    assert!(status.success());
    path
}

fn set(path: &PathBuf, cell: &str, formula: &str) {
    let status = tabula()
        .args(["set", path.to_str().unwrap(), cell, formula])
        .status()
        .expect("tabula set");
    assert!(status.success());
}

fn stdout_of(output: std::process::Output) -> String {
    assert!(output.status.success(), "exit status {:?}", output.status);
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

// ---------------------------------------------------------------------------
// set/get: formula text round-trips verbatim
// ---------------------------------------------------------------------------

#[test]
fn set_then_get_returns_exact_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "=B1 + 2 ");
    let output = tabula()
        .args(["get", path.to_str().unwrap(), "A1"])
        .output()
        .expect("tabula get");
    assert_eq!(stdout_of(output), "=B1 + 2");

    // trim_end above eats the trailing space; compare raw bytes too
    let output = tabula()
        .args(["get", path.to_str().unwrap(), "A1"])
        .output()
        .expect("tabula get");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "=B1 + 2 \n");
}

// ---------------------------------------------------------------------------
// show: evaluation through the file
// ---------------------------------------------------------------------------

#[test]
fn show_evaluates_arithmetic() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "=1+2*3");
    let output = tabula()
        .args(["show", path.to_str().unwrap(), "A1"])
        .output()
        .expect("tabula show");
    assert_eq!(stdout_of(output), "7");
}

#[test]
fn show_resolves_cross_cell_references() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "3");
    set(&path, "B1", "=A1*2");
    let output = tabula()
        .args(["show", path.to_str().unwrap(), "B1"])
        .output()
        .expect("tabula show");
    assert_eq!(stdout_of(output), "6");
}

#[test]
fn show_renders_invalid_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "=1/0");
    let output = tabula()
        .args(["show", path.to_str().unwrap(), "A1"])
        .output()
        .expect("tabula show");
    assert_eq!(stdout_of(output), "####");
}

#[test]
fn show_json_exposes_value_tag() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "B2", "=2+2");
    let output = tabula()
        .args(["show", path.to_str().unwrap(), "B2", "--json"])
        .output()
        .expect("tabula show --json");

    let cell: serde_json::Value = serde_json::from_str(&stdout_of(output)).expect("valid JSON");
    assert_eq!(cell["cell"], "B2");
    assert_eq!(cell["formula"], "=2+2");
    assert_eq!(cell["value"]["type"], "number");
    assert_eq!(cell["value"]["value"], 4.0);
    assert_eq!(cell["display"], "4");
}

// ---------------------------------------------------------------------------
// eval: one-off formula against the sheet
// ---------------------------------------------------------------------------

#[test]
fn eval_does_not_modify_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "21");
    let output = tabula()
        .args(["eval", path.to_str().unwrap(), "=A1*2"])
        .output()
        .expect("tabula eval");
    assert_eq!(stdout_of(output), "42");

    let output = tabula()
        .args(["get", path.to_str().unwrap(), "B1"])
        .output()
        .expect("tabula get");
    assert_eq!(stdout_of(output), "");
}

// ---------------------------------------------------------------------------
// recalc
// ---------------------------------------------------------------------------

#[test]
fn recalc_reports_cell_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "1");
    set(&path, "B1", "=A1+1");
    let output = tabula()
        .args(["recalc", path.to_str().unwrap()])
        .output()
        .expect("tabula recalc");
    let summary = stdout_of(output);
    assert!(summary.starts_with("2 cells"), "got: {}", summary);
}

// ---------------------------------------------------------------------------
// find
// ---------------------------------------------------------------------------

#[test]
fn find_prints_location_and_display() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "C3", "=6*7");
    let output = tabula()
        .args(["find", path.to_str().unwrap(), "42"])
        .output()
        .expect("tabula find");
    assert_eq!(stdout_of(output), "C3\t42");
}

#[test]
fn find_miss_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "hello");
    let output = tabula()
        .args(["find", path.to_str().unwrap(), "goodbye"])
        .output()
        .expect("tabula find");
    assert_eq!(output.status.code(), Some(1));
}

// ---------------------------------------------------------------------------
// sort
// ---------------------------------------------------------------------------

#[test]
fn sort_reorders_rows_by_formula_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "cherry");
    set(&path, "A2", "apple");
    set(&path, "A3", "banana");
    let status = tabula()
        .args(["sort", path.to_str().unwrap(), "A1:A3", "--key", "0"])
        .status()
        .expect("tabula sort");
    assert!(status.success());

    let output = tabula()
        .args(["get", path.to_str().unwrap(), "A1"])
        .output()
        .expect("tabula get");
    assert_eq!(stdout_of(output), "apple");
}

// ---------------------------------------------------------------------------
// copy / paste
// ---------------------------------------------------------------------------

#[test]
fn copy_emits_tab_separated_formulas() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "1");
    set(&path, "B1", "=A1");
    let output = tabula()
        .args(["copy", path.to_str().unwrap(), "A1:B1"])
        .output()
        .expect("tabula copy");
    assert_eq!(stdout_of(output), "1\t=A1");
}

#[test]
fn paste_block_at_anchor() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    let mut child = tabula()
        .args(["paste", path.to_str().unwrap(), "B2"])
        .stdin(Stdio::piped())
        .spawn()
        .expect("tabula paste");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"1\t2\n3\t4\n")
        .unwrap();
    assert!(child.wait().unwrap().success());

    let output = tabula()
        .args(["show", path.to_str().unwrap(), "C3"])
        .output()
        .expect("tabula show");
    assert_eq!(stdout_of(output), "4");
}

#[test]
fn paste_shape_mismatch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    let mut child = tabula()
        .args(["paste", path.to_str().unwrap(), "A1:C1"])
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("tabula paste");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"1\t2\n3\t4\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("same size"), "stderr: {}", stderr);
}

// ---------------------------------------------------------------------------
// clear
// ---------------------------------------------------------------------------

#[test]
fn clear_range_removes_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    set(&path, "A1", "1");
    set(&path, "B1", "2");
    let status = tabula()
        .args(["clear", path.to_str().unwrap(), "A1"])
        .status()
        .expect("tabula clear");
    assert!(status.success());

    let output = tabula()
        .args(["get", path.to_str().unwrap(), "A1"])
        .output()
        .expect("tabula get");
    assert_eq!(stdout_of(output), "");
    let output = tabula()
        .args(["get", path.to_str().unwrap(), "B1"])
        .output()
        .expect("tabula get");
    assert_eq!(stdout_of(output), "2");
}

// ---------------------------------------------------------------------------
// error paths
// ---------------------------------------------------------------------------

#[test]
fn bad_cell_reference_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = new_sheet(&dir);

    let output = tabula()
        .args(["get", path.to_str().unwrap(), "AA1"])
        .output()
        .expect("tabula get");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn non_sheet_file_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.sheet");
    std::fs::write(&path, b"not a database").unwrap();

    let output = tabula()
        .args(["get", path.to_str().unwrap(), "A1"])
        .output()
        .expect("tabula get");
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a Tabula sheet file"), "stderr: {}", stderr);
}
