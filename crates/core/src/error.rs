use thiserror::Error;

/// Structural address errors. These indicate a configuration defect and are
/// never recovered by guessing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Address text that is not `LETTERS` followed by a positive row number.
    #[error("invalid address: '{0}'")]
    InvalidAddress(String),

    /// Range text with more than one `:` separator.
    #[error("invalid range: '{0}'")]
    InvalidRange(String),

    /// A range projected against an anchor lands above or left of it.
    #[error("range {range} lies outside anchor {anchor}")]
    OutOfBounds { range: String, anchor: String },
}
