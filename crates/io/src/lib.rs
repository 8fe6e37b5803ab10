// Workbook file I/O

pub mod error;
pub mod naming;
pub mod styles;
pub mod xlsx;

pub use error::XlsxError;
pub use naming::{copy_output_path, mark_output_path};
pub use xlsx::{SaveResult, XlsxDocument};
