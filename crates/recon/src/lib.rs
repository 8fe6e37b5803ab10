//! `plandiff-recon` — Reconciliation engine for plan workbooks.
//!
//! Pure engine crate: documents come in through the [`Document`] trait,
//! a sheet profile says what to compare, and a [`RunReport`] comes out.
//! No CLI or file-format dependencies.

pub mod blocks;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod engine;
pub mod error;
pub mod formulas;
pub mod model;
pub mod records;
pub mod text_diff;

pub use config::{Profile, SheetPlan, BUILTIN_PROFILE};
pub use document::{Document, MemoryDocument, Rgb, RED};
pub use engine::{run_copy, run_mark, MarkOptions};
pub use error::ReconError;
pub use model::{Change, ChangeSource, RunMode, RunReport, SheetReport};
pub use text_diff::{find_text_diff, TextSpan};
