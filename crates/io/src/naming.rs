//! Default output paths, written beside the target workbook.

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::error::XlsxError;

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sibling(target: &Path, file_name: String) -> PathBuf {
    match target.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// `<target>_赤字変更(参照ファイル：<reference>)_<timestamp>.xlsx`
///
/// `timestamp_format` is a chrono strftime string; one chrono cannot
/// render is an error rather than a formatting panic.
pub fn mark_output_path(
    target: &Path,
    reference: &Path,
    at: DateTime<Local>,
    timestamp_format: &str,
) -> Result<PathBuf, XlsxError> {
    let items: Vec<Item> = StrftimeItems::new(timestamp_format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(XlsxError::TimestampFormat(timestamp_format.to_string()));
    }
    let name = format!(
        "{}_赤字変更(参照ファイル：{})_{}.xlsx",
        stem(target),
        stem(reference),
        at.format_with_items(items.iter())
    );
    Ok(sibling(target, name))
}

/// `<target>のコピー.xlsx`
pub fn copy_output_path(target: &Path) -> PathBuf {
    sibling(target, format!("{}のコピー.xlsx", stem(target)))
}
