// End-to-end tests for the plandiff binary.
//
// Workbooks are built with rust_xlsxwriter in a temp dir. HOME and
// XDG_CONFIG_HOME point into the same temp dir so the settings file the
// binary creates never touches the real user config.
//
// Run with: cargo test -p plandiff-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use plandiff_core::{Address, CellValue};
use plandiff_io::XlsxDocument;
use plandiff_recon::Document;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

const PLAN_CHANGE: &str = "【HP公開】計画変更届";
const REGISTER: &str = "登録申請書";

fn plandiff(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_plandiff"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("PLANDIFF_LOG");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    plandiff(home).args(args).output().expect("run plandiff")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Two-sheet plan: the change notice (E5 text, E10 free text) and the
/// application sheet (E26 compared into indicator P26, G45 copied as text).
fn write_plan(path: &Path, applicant: &str, reason: &str, e26: &str, g45: f64) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name(REGISTER).unwrap();
    sheet.write_string(25, 4, e26).unwrap();
    sheet.write_number(44, 6, g45).unwrap();

    let sheet = workbook.add_worksheet().set_name(PLAN_CHANGE).unwrap();
    sheet.write_string(4, 4, applicant).unwrap();
    sheet.write_string(9, 4, reason).unwrap();
    workbook.save(path).unwrap();
}

struct Fixture {
    dir: TempDir,
    target: PathBuf,
    reference: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("plan_v2.xlsx");
    let reference = dir.path().join("plan_v1.xlsx");
    write_plan(&target, "山田林業", "plan was revised", "北部", 12.0);
    write_plan(&reference, "山田林業", "plan was drafted", "南部", 7.0);
    Fixture { dir, target, reference }
}

fn a(s: &str) -> Address {
    Address::parse(s).unwrap()
}

fn value(doc: &XlsxDocument, sheet: &str, address: &str) -> CellValue {
    let range = plandiff_core::CellRange::single(a(address));
    doc.read_range(sheet, &range).unwrap().cell(a(address)).clone()
}

// ===========================================================================
// mark
// ===========================================================================

#[test]
fn mark_writes_output_and_json_report() {
    let fx = fixture();
    let out = fx.dir.path().join("marked.xlsx");
    let output = run(
        fx.dir.path(),
        &[
            "mark",
            fx.target.to_str().unwrap(),
            fx.reference.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--json",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout is one JSON value");
    assert_eq!(report["mode"], "mark");
    assert_eq!(report["summary"]["sheets_processed"], 2);
    assert_eq!(report["summary"]["changed"], 1);

    let plan_change = report["sheets"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["sheet"] == PLAN_CHANGE)
        .unwrap();
    assert_eq!(plan_change["changed"][0]["range"], "E10");

    let marked = XlsxDocument::open(&out).unwrap();
    assert_eq!(value(&marked, REGISTER, "P26"), CellValue::text("有"));
    assert_eq!(value(&marked, REGISTER, "P27"), CellValue::text("無"));
    assert_eq!(value(&marked, PLAN_CHANGE, "E10"), CellValue::text("plan was revised"));
}

#[test]
fn mark_default_name_sits_beside_target() {
    let fx = fixture();
    let output = run(
        fx.dir.path(),
        &["mark", fx.target.to_str().unwrap(), fx.reference.to_str().unwrap()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let produced: Vec<String> = std::fs::read_dir(fx.dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("plan_v2_赤字変更(参照ファイル：plan_v1)_"))
        .collect();
    assert_eq!(produced.len(), 1, "{produced:?}");
    assert!(produced[0].ends_with(".xlsx"));
}

#[test]
fn mark_changes_csv_lists_addresses() {
    let fx = fixture();
    let out = fx.dir.path().join("marked.xlsx");
    let csv_path = fx.dir.path().join("changes.csv");
    let output = run(
        fx.dir.path(),
        &[
            "mark",
            fx.target.to_str().unwrap(),
            fx.reference.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--changes",
            csv_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "sheet,address,kind");
    assert_eq!(lines[1], format!("{PLAN_CHANGE},E10,cell"));
}

#[test]
fn mark_refuses_to_overwrite_reference() {
    let fx = fixture();
    let output = run(
        fx.dir.path(),
        &[
            "mark",
            fx.target.to_str().unwrap(),
            fx.reference.to_str().unwrap(),
            "-o",
            fx.reference.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("reference workbook"));
}

#[test]
fn in_place_conflicts_with_output() {
    let fx = fixture();
    let output = run(
        fx.dir.path(),
        &[
            "mark",
            fx.target.to_str().unwrap(),
            fx.reference.to_str().unwrap(),
            "--in-place",
            "-o",
            "x.xlsx",
        ],
    );
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_workbook_exits_4() {
    let fx = fixture();
    let absent = fx.dir.path().join("absent.xlsx");
    let output = run(
        fx.dir.path(),
        &["mark", absent.to_str().unwrap(), fx.reference.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("error: "));
}

// ===========================================================================
// copy
// ===========================================================================

#[test]
fn copy_fills_target_with_reference_values() {
    let fx = fixture();
    let output = run(
        fx.dir.path(),
        &["copy", fx.target.to_str().unwrap(), fx.reference.to_str().unwrap(), "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["mode"], "copy");

    let copied = XlsxDocument::open(&fx.dir.path().join("plan_v2のコピー.xlsx")).unwrap();
    assert_eq!(value(&copied, REGISTER, "E26"), CellValue::text("南部"));
    assert_eq!(value(&copied, REGISTER, "G45"), CellValue::text("7"));
    assert_eq!(value(&copied, PLAN_CHANGE, "E10"), CellValue::text("plan was drafted"));
}

// ===========================================================================
// profile
// ===========================================================================

#[test]
fn profile_show_builtin_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["profile", "show", "--builtin", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let profile: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(profile["format_version"], "1.3.0");
    assert_eq!(profile["sheets"].as_array().unwrap().len(), 21);
}

#[test]
fn profile_validate_reports_bad_address() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "name = \"bad\"\n\n[[sheets]]\nname = \"s\"\ncheck = [\"E5:\"]\n").unwrap();

    let output = run(dir.path(), &["profile", "validate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    let err = stderr(&output);
    assert!(err.contains("sheet 's'"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn profile_validate_accepts_good_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("good.toml");
    std::fs::write(&path, "name = \"good\"\n\n[[sheets]]\nname = \"s\"\ncheck = [\"E5\"]\n").unwrap();

    let output = run(dir.path(), &["profile", "validate", path.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("ok (1 sheets)"));
}
