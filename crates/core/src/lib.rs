//! `plandiff-core` — coordinate algebra and value grids.
//!
//! Pure crate: no document access, no IO. Everything here operates on
//! addresses and on grids that a caller has already read.

pub mod address;
pub mod error;
pub mod grid;
pub mod range;
pub mod value;

pub use address::{column_to_number, number_to_column, Address};
pub use error::AddressError;
pub use grid::{regions_equal, Grid};
pub use range::{CellRange, RelativeRect};
pub use value::CellValue;
