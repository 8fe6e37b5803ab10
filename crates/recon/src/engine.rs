use plandiff_core::{number_to_column, CellRange, CellValue, Grid};

use crate::blocks::reconcile_blocks;
use crate::config::{Profile, SheetPlan};
use crate::dispatch::{record_failure, SheetPair};
use crate::document::{Document, Rgb, RED};
use crate::error::ReconError;
use crate::formulas::compare_formula_columns;
use crate::model::{Change, ChangeSource, IndicatorWrite, RunMode, RunReport, SheetReport};
use crate::records::reconcile_records;
use crate::text_diff::find_text_diff;

/// Sentinels and color used by a mark run.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkOptions {
    pub color: Rgb,
    pub changed: CellValue,
    pub unchanged: CellValue,
}

impl Default for MarkOptions {
    fn default() -> Self {
        Self {
            color: RED,
            changed: CellValue::text("有"),
            unchanged: CellValue::text("無"),
        }
    }
}

/// Flag every changed address of every profile sheet in the target, write
/// indicator sentinels, and color the flagged cells.
///
/// Per-address failures are recorded in the report. Structural failures
/// (a record window that does not fit, a sheet that cannot be read) abort
/// the run so the caller never saves a half-processed target.
pub fn run_mark(
    profile: &Profile,
    target: &mut dyn Document,
    reference: &dyn Document,
    options: &MarkOptions,
) -> Result<RunReport, ReconError> {
    let mut report = RunReport::new(RunMode::Mark, &profile.name);

    for plan in &profile.sheets {
        if !present_in_both(&plan.name, &*target, reference, &mut report) {
            continue;
        }
        let sheet = mark_sheet(plan, target, reference, options)?;
        tracing::info!(
            sheet = %plan.name,
            changed = sheet.changed.len(),
            indicators = sheet.indicators.len(),
            failures = sheet.failures.len(),
            "sheet marked"
        );
        report.sheets.push(sheet);
    }

    report.finish();
    Ok(report)
}

/// Overwrite every differing `copy` region of the target with the
/// reference's values, then carry over the reference's column widths and
/// row heights.
pub fn run_copy(
    profile: &Profile,
    target: &mut dyn Document,
    reference: &dyn Document,
) -> Result<RunReport, ReconError> {
    let mut report = RunReport::new(RunMode::Copy, &profile.name);

    for plan in profile.sheets.iter().filter(|p| !p.copy.is_empty()) {
        if !present_in_both(&plan.name, &*target, reference, &mut report) {
            continue;
        }
        let pair = SheetPair::load(&*target, reference, &plan.name)?;
        let mut sheet = SheetReport { sheet: plan.name.clone(), ..Default::default() };

        for action in pair.copies(plan, &mut sheet) {
            match target.write_range(&plan.name, &action.range, &action.values) {
                Ok(()) => sheet.copied.push(action.range),
                Err(err) => record_failure(&mut sheet, &plan.name, &action.range, &err),
            }
        }
        copy_dimensions(&plan.name, target, reference, &mut sheet)?;

        tracing::info!(
            sheet = %plan.name,
            copied = sheet.copied.len(),
            resized = sheet.resized_columns.len() + sheet.resized_rows.len(),
            "sheet copied"
        );
        report.sheets.push(sheet);
    }

    report.finish();
    Ok(report)
}

/// Match widths and heights over the reference's used range, stopping at
/// the last column and row that hold a value in the target.
fn copy_dimensions(
    name: &str,
    target: &mut dyn Document,
    reference: &dyn Document,
    sheet: &mut SheetReport,
) -> Result<(), ReconError> {
    let Some(used) = reference.used_range(name)? else {
        return Ok(());
    };
    let values = target.read_range(name, &used)?;
    let (width, height) = (used.width() as usize, used.height() as usize);
    let filled = |row: usize, col: usize| !values.get(row, col).is_blank();
    let top_left = used.top_left();

    if let Some(last) = (0..width).rev().find(|&col| (0..height).any(|row| filled(row, col))) {
        for col in top_left.col..=top_left.col + last as u32 {
            let wanted = reference.column_width(name, col)?;
            if target.column_width(name, col)? != wanted {
                target.set_column_width(name, col, wanted)?;
                sheet.resized_columns.push(number_to_column(col));
            }
        }
    }

    if let Some(last) = (0..height).rev().find(|&row| (0..width).any(|col| filled(row, col))) {
        for row in top_left.row..=top_left.row + last as u32 {
            let wanted = reference.row_height(name, row)?;
            if target.row_height(name, row)? != wanted {
                target.set_row_height(name, row, wanted)?;
                sheet.resized_rows.push(row);
            }
        }
    }
    Ok(())
}

fn present_in_both(sheet: &str, target: &dyn Document, reference: &dyn Document, report: &mut RunReport) -> bool {
    let missing = match (target.has_sheet(sheet), reference.has_sheet(sheet)) {
        (true, true) => return true,
        (false, _) => "target",
        (true, false) => "reference",
    };
    tracing::warn!(sheet, missing_from = missing, "sheet not found, skipping");
    report.skipped_sheets.push(sheet.to_string());
    false
}

fn mark_sheet(
    plan: &SheetPlan,
    target: &mut dyn Document,
    reference: &dyn Document,
    options: &MarkOptions,
) -> Result<SheetReport, ReconError> {
    let pair = SheetPair::load(&*target, reference, &plan.name)?;
    let mut sheet = SheetReport { sheet: plan.name.clone(), ..Default::default() };

    let mut changes: Vec<Change> = pair
        .flag(&plan.check, &mut sheet)
        .into_iter()
        .map(|range| Change { range, source: ChangeSource::Cell })
        .collect();

    for rule in &plan.indicators {
        let write = pair
            .indicator(rule, &options.changed, &options.unchanged)
            .and_then(|wanted| match wanted {
                Some(value) => {
                    let grid = Grid::new(rule.indicator.top_left(), vec![vec![value.clone()]]);
                    target.write_range(&plan.name, &rule.indicator, &grid)?;
                    Ok(Some(value))
                }
                None => Ok(None),
            });
        match write {
            Ok(Some(value)) => sheet.indicators.push(IndicatorWrite { indicator: rule.indicator, value }),
            Ok(None) => {}
            Err(err) => record_failure(&mut sheet, &plan.name, &rule.compare, &err),
        }
    }

    let bottom_right = pair.bottom_right();

    if let Some(table) = &plan.records {
        let (alignment, changed) = reconcile_records(pair.target(), pair.reference(), table, bottom_right.row)?;
        tracing::debug!(
            sheet = %plan.name,
            matched = alignment.matched.len(),
            inserted = alignment.inserted.len(),
            deleted = alignment.deleted.len(),
            "records aligned"
        );
        changes.extend(changed.into_iter().map(|range| Change { range, source: ChangeSource::Record }));
    }

    if let Some(table) = &plan.blocks {
        let (alignment, changed) = reconcile_blocks(pair.target(), pair.reference(), table, bottom_right);
        tracing::debug!(
            sheet = %plan.name,
            matched = alignment.matched.len(),
            introduced = alignment.introduced.len(),
            "blocks aligned"
        );
        changes.extend(changed.into_iter().map(|range| Change { range, source: ChangeSource::Block }));
    }

    if let Some(columns) = &plan.formulas {
        let frame = pair.frame();
        let target_formulas = target.read_formulas(&plan.name, &frame)?;
        let reference_formulas = reference.read_formulas(&plan.name, &frame)?;
        let changed = compare_formula_columns(&target_formulas, &reference_formulas, columns, bottom_right.row);
        changes.extend(changed.into_iter().map(|range| Change { range, source: ChangeSource::Formula }));
    }

    for change in &changes {
        if let Err(err) = paint(plan, &pair, target, &change.range, options.color) {
            record_failure(&mut sheet, &plan.name, &change.range, &err);
        }
    }

    sheet.changed = changes;
    Ok(sheet)
}

/// Color a flagged range. Text cells with a word diff get only the changed
/// words colored; everything else is colored whole.
fn paint(
    plan: &SheetPlan,
    pair: &SheetPair,
    target: &mut dyn Document,
    range: &CellRange,
    color: Rgb,
) -> Result<(), ReconError> {
    if plan.is_text_cell(range) {
        let cell = range.top_left();
        if let (Some(new), Some(old)) = (pair.target().cell(cell).as_text(), pair.reference().cell(cell).as_text()) {
            let spans = find_text_diff(new, old);
            if !spans.is_empty() {
                return target.set_text_color(&plan.name, cell, &spans, color);
            }
        }
    }
    target.set_font_color(&plan.name, range, color)
}
