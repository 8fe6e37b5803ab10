use plandiff_core::{CellRange, CellValue};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Row alignment
// ---------------------------------------------------------------------------

/// A target row paired with a reference row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRecord {
    pub target_row: u32,
    pub reference_row: u32,
    /// Number of compare columns whose values differ.
    pub distance: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordAlignment {
    pub matched: Vec<MatchedRecord>,
    /// Target rows with no counterpart; reported wholesale.
    pub inserted: Vec<u32>,
    /// Reference rows with no counterpart; never touch the target.
    pub deleted: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Block alignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedBlock {
    pub target_col: u32,
    pub reference_col: u32,
    pub label: CellValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockAlignment {
    pub matched: Vec<MatchedBlock>,
    /// Target block columns whose label has no reference counterpart.
    pub introduced: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Mark,
    Copy,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mark => write!(f, "mark"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// Where a changed address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    Cell,
    Record,
    Block,
    Formula,
}

impl std::fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cell => write!(f, "cell"),
            Self::Record => write!(f, "record"),
            Self::Block => write!(f, "block"),
            Self::Formula => write!(f, "formula"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub range: CellRange,
    pub source: ChangeSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorWrite {
    pub indicator: CellRange,
    pub value: CellValue,
}

/// One address that could not be processed; the run continued past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressFailure {
    pub address: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetReport {
    pub sheet: String,
    pub changed: Vec<Change>,
    pub copied: Vec<CellRange>,
    pub indicators: Vec<IndicatorWrite>,
    pub failures: Vec<AddressFailure>,
    /// Columns (letters) whose width was taken from the reference.
    pub resized_columns: Vec<String>,
    /// Rows whose height was taken from the reference.
    pub resized_rows: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sheets_processed: usize,
    pub sheets_skipped: usize,
    pub changed: usize,
    pub copied: usize,
    pub indicator_writes: usize,
    pub resized: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub profile: String,
    pub sheets: Vec<SheetReport>,
    pub skipped_sheets: Vec<String>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(mode: RunMode, profile: &str) -> Self {
        Self {
            mode,
            profile: profile.to_string(),
            sheets: Vec::new(),
            skipped_sheets: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    pub(crate) fn finish(&mut self) {
        self.summary = RunSummary {
            sheets_processed: self.sheets.len(),
            sheets_skipped: self.skipped_sheets.len(),
            changed: self.sheets.iter().map(|s| s.changed.len()).sum(),
            copied: self.sheets.iter().map(|s| s.copied.len()).sum(),
            indicator_writes: self.sheets.iter().map(|s| s.indicators.len()).sum(),
            resized: self
                .sheets
                .iter()
                .map(|s| s.resized_columns.len() + s.resized_rows.len())
                .sum(),
            failures: self.sheets.iter().map(|s| s.failures.len()).sum(),
        };
    }
}
