use plandiff_core::AddressError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// Malformed address, malformed range, or a range outside its frame.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// A key/compare/check column that is not inside the record window.
    #[error("column {column} at row {row} lies outside the record window {window}")]
    ColumnOutsideWindow { column: String, row: u32, window: String },

    /// A profile sheet that one of the documents does not contain.
    #[error("sheet '{0}' not found")]
    MissingSheet(String),

    /// A read or write against a document failed.
    #[error("sheet '{sheet}', {address}: {message}")]
    Io { sheet: String, address: String, message: String },

    /// TOML parse / deserialization error.
    #[error("profile parse error: {0}")]
    ConfigParse(String),

    /// Profile validation error (bad address, bad column span, etc.).
    #[error("profile validation error: {0}")]
    ConfigValidation(String),
}

impl ReconError {
    pub fn io(sheet: &str, address: impl ToString, message: impl ToString) -> Self {
        Self::Io {
            sheet: sheet.to_string(),
            address: address.to_string(),
            message: message.to_string(),
        }
    }
}
