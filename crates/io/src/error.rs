use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("failed to open workbook {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    #[error("failed to read sheet '{sheet}': {message}")]
    Read { sheet: String, message: String },

    #[error("workbook {} contains no sheets", .0.display())]
    NoSheets(PathBuf),

    #[error("failed to write sheet '{sheet}', {address}: {message}")]
    Write { sheet: String, address: String, message: String },

    #[error("failed to save workbook {}: {message}", path.display())]
    Save { path: PathBuf, message: String },

    #[error("invalid timestamp format '{0}'")]
    TimestampFormat(String),
}
