//! Per-sheet actions over a loaded pair of grids: flag, copy, indicator.
//!
//! Each designated address is handled on its own. A failure on one address
//! is logged with sheet and address, recorded in the sheet report, and the
//! next address is processed.

use plandiff_core::{regions_equal, Address, CellRange, CellValue, Grid};

use crate::config::{IndicatorRule, SheetPlan};
use crate::document::Document;
use crate::error::ReconError;
use crate::model::{AddressFailure, SheetReport};

/// Both documents' values for one sheet, captured over the same frame.
#[derive(Debug, Clone)]
pub struct SheetPair {
    sheet: String,
    frame: CellRange,
    target: Grid,
    reference: Grid,
}

/// A region to overwrite and the values to put there.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyAction {
    pub range: CellRange,
    pub values: Grid,
}

impl SheetPair {
    /// Read `sheet` from both documents over A1 through the bottom-right
    /// corner of the union of their used ranges.
    pub fn load(target: &dyn Document, reference: &dyn Document, sheet: &str) -> Result<Self, ReconError> {
        let frame = comparison_frame(target.used_range(sheet)?, reference.used_range(sheet)?);
        tracing::debug!(sheet, frame = %frame, "loading sheet pair");
        Ok(Self {
            sheet: sheet.to_string(),
            frame,
            target: target.read_range(sheet, &frame)?,
            reference: reference.read_range(sheet, &frame)?,
        })
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn frame(&self) -> CellRange {
        self.frame
    }

    pub fn bottom_right(&self) -> Address {
        self.frame.bottom_right()
    }

    pub fn target(&self) -> &Grid {
        &self.target
    }

    pub fn reference(&self) -> &Grid {
        &self.reference
    }

    pub fn is_equal(&self, range: &CellRange) -> Result<bool, ReconError> {
        Ok(regions_equal(&self.target, &self.reference, range)?)
    }

    /// Ranges whose target and reference values differ, in input order.
    pub fn flag(&self, ranges: &[CellRange], report: &mut SheetReport) -> Vec<CellRange> {
        ranges
            .iter()
            .filter(|range| match self.is_equal(range) {
                Ok(equal) => !equal,
                Err(err) => {
                    record_failure(report, &self.sheet, range, &err);
                    false
                }
            })
            .copied()
            .collect()
    }

    /// Overwrites needed to bring the target in line with the reference.
    /// Ranges listed in `text_coerce` carry text values.
    pub fn copies(&self, plan: &SheetPlan, report: &mut SheetReport) -> Vec<CopyAction> {
        let mut actions = Vec::new();
        for range in &plan.copy {
            let action = self.is_equal(range).and_then(|equal| {
                if equal {
                    return Ok(None);
                }
                let values = self.reference.value_at(range)?;
                let values = if plan.coerces_text(range) {
                    values.map(CellValue::coerce_text)
                } else {
                    values
                };
                Ok(Some(CopyAction { range: *range, values }))
            });
            match action {
                Ok(Some(action)) => actions.push(action),
                Ok(None) => {}
                Err(err) => record_failure(report, &self.sheet, range, &err),
            }
        }
        actions
    }

    /// The sentinel the indicator cell should hold, or `None` when it
    /// already holds it.
    pub fn indicator(
        &self,
        rule: &IndicatorRule,
        changed: &CellValue,
        unchanged: &CellValue,
    ) -> Result<Option<CellValue>, ReconError> {
        let wanted = if self.is_equal(&rule.compare)? { unchanged } else { changed };
        if self.target.cell(rule.indicator.top_left()) == wanted {
            return Ok(None);
        }
        Ok(Some(wanted.clone()))
    }
}

/// A1 through the bottom-right of both used ranges. Empty sheets give A1.
pub fn comparison_frame(target: Option<CellRange>, reference: Option<CellRange>) -> CellRange {
    let a1 = Address { col: 1, row: 1 };
    let used = match (target, reference) {
        (Some(t), Some(r)) => t.union(&r),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => return CellRange::single(a1),
    };
    CellRange::new(a1, used.bottom_right())
}

pub(crate) fn record_failure(report: &mut SheetReport, sheet: &str, range: &CellRange, err: &ReconError) {
    tracing::error!(sheet, address = %range, "{err}");
    report.failures.push(AddressFailure {
        address: range.to_string(),
        message: err.to_string(),
    });
}
