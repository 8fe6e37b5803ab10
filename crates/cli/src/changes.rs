//! `--changes` CSV: one row per changed address.

use std::path::Path;

use plandiff_recon::RunReport;
use serde::Serialize;

#[derive(Serialize)]
struct ChangeRow<'a> {
    sheet: &'a str,
    address: String,
    kind: String,
}

/// Write a `sheet,address,kind` header and one row per change, even when
/// there are none.
/// Returns the number of rows written.
pub fn write_changes(path: &Path, report: &RunReport) -> Result<usize, csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["sheet", "address", "kind"])?;
    let mut rows = 0;
    for sheet in &report.sheets {
        for change in &sheet.changed {
            writer.serialize(ChangeRow {
                sheet: &sheet.sheet,
                address: change.range.to_string(),
                kind: change.source.to_string(),
            })?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}
