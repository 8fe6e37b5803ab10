//! `plandiff mark` and `plandiff copy`.

use std::path::{Path, PathBuf};

use chrono::Local;
use plandiff_config::Settings;
use plandiff_core::CellValue;
use plandiff_io::{copy_output_path, mark_output_path, XlsxDocument};
use plandiff_recon::{run_copy, run_mark, MarkOptions, RunReport};

use crate::changes::write_changes;
use crate::profile::resolve_profile;
use crate::CliError;

pub struct MarkArgs {
    pub target: PathBuf,
    pub reference: PathBuf,
    pub output: Option<PathBuf>,
    pub in_place: bool,
    pub profile: Option<PathBuf>,
    pub json: bool,
    pub changes: Option<PathBuf>,
}

pub struct CopyArgs {
    pub target: PathBuf,
    pub reference: PathBuf,
    pub output: Option<PathBuf>,
    pub profile: Option<PathBuf>,
    pub json: bool,
}

pub fn cmd_mark(args: MarkArgs) -> Result<(), CliError> {
    let settings = Settings::load();
    let profile = resolve_profile(args.profile.as_deref(), &settings)?;

    let output = if args.in_place {
        args.target.clone()
    } else if let Some(output) = &args.output {
        output.clone()
    } else {
        mark_output_path(&args.target, &args.reference, Local::now(), settings.timestamp_format())
            .map_err(|e| CliError::usage(e.to_string()))?
    };
    guard_reference(&output, &args.reference)?;

    let mut target = open(&args.target)?;
    let reference = open(&args.reference)?;

    let options = MarkOptions {
        color: settings.mark_rgb(),
        changed: CellValue::text(settings.indicator_changed.as_str()),
        unchanged: CellValue::text(settings.indicator_unchanged.as_str()),
    };
    let report = run_mark(&profile, &mut target, &reference, &options)
        .map_err(|e| CliError::reconcile(e.to_string()).with_hint("nothing was saved"))?;

    target
        .save(&output)
        .map_err(|e| CliError::save(e.to_string()))?;

    if let Some(path) = &args.changes {
        let rows = write_changes(path, &report)
            .map_err(|e| CliError::save(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {} changes to {}", rows, path.display());
    }

    emit(&report, &output, args.json)
}

pub fn cmd_copy(args: CopyArgs) -> Result<(), CliError> {
    let settings = Settings::load();
    let profile = resolve_profile(args.profile.as_deref(), &settings)?;

    let output = args.output.clone().unwrap_or_else(|| copy_output_path(&args.target));
    guard_reference(&output, &args.reference)?;

    let mut target = open(&args.target)?;
    let reference = open(&args.reference)?;

    let report = run_copy(&profile, &mut target, &reference)
        .map_err(|e| CliError::reconcile(e.to_string()).with_hint("nothing was saved"))?;

    target
        .save(&output)
        .map_err(|e| CliError::save(e.to_string()))?;

    emit(&report, &output, args.json)
}

fn open(path: &Path) -> Result<XlsxDocument, CliError> {
    XlsxDocument::open(path).map_err(|e| CliError::document(e.to_string()))
}

/// The reference workbook is read-only.
fn guard_reference(output: &Path, reference: &Path) -> Result<(), CliError> {
    let same = match (output.canonicalize(), reference.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => output == reference,
    };
    if same {
        return Err(CliError::usage("output would overwrite the reference workbook")
            .with_hint("choose another path with -o"));
    }
    Ok(())
}

fn emit(report: &RunReport, output: &Path, json: bool) -> Result<(), CliError> {
    if json {
        let json_str = serde_json::to_string_pretty(report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &report.summary;
    eprintln!(
        "{}: {} sheets, {} changed, {} copied, {} indicator writes, {} resized, {} failures",
        report.mode, s.sheets_processed, s.changed, s.copied, s.indicator_writes, s.resized, s.failures,
    );
    if !report.skipped_sheets.is_empty() {
        eprintln!("skipped (missing sheet): {}", report.skipped_sheets.join(", "));
    }
    for sheet in &report.sheets {
        for failure in &sheet.failures {
            eprintln!("failed: {} {}: {}", sheet.sheet, failure.address, failure.message);
        }
    }
    eprintln!("wrote {}", output.display());
    Ok(())
}
