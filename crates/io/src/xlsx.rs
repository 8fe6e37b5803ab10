//! Excel workbook backend for the reconciliation engine.
//!
//! Workbooks are read whole with calamine (values plus formula text) and
//! written back with rust_xlsxwriter. Cell formats, merges, column widths
//! and row heights come from the package itself (see [`crate::styles`]) and
//! are replayed on save, so a saved plan keeps its layout. A font color set
//! during a run replaces only the color of the cell's own font.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use plandiff_core::{Address, CellRange, CellValue, Grid};
use plandiff_recon::document::{Document, Rgb};
use plandiff_recon::text_diff::TextSpan;
use plandiff_recon::ReconError;
use rust_xlsxwriter::{Color, Format, Formula, Workbook as XlsxWorkbook, Worksheet};

use crate::error::XlsxError;
use crate::styles::{read_workbook_styles, CellStyle, SheetLayout, WorkbookStyles, MAX_COLUMNS, MAX_ROWS};

#[derive(Debug, Clone, Default)]
struct XlsxSheet {
    name: String,
    values: HashMap<Address, CellValue>,
    /// Formula text with the leading `=`.
    formulas: HashMap<Address, String>,
    colors: HashMap<Address, Rgb>,
    spans: HashMap<Address, (Vec<TextSpan>, Rgb)>,
    layout: SheetLayout,
}

impl XlsxSheet {
    fn used_range(&self) -> Option<CellRange> {
        let cells: Vec<CellRange> = self
            .values
            .keys()
            .chain(self.formulas.keys())
            .map(|a| CellRange::single(*a))
            .collect();
        CellRange::bounding(&cells)
    }
}

/// Statistics from a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveResult {
    pub sheets_saved: usize,
    pub cells_saved: usize,
    pub formulas_saved: usize,
    pub colored_cells: usize,
    pub merged_ranges: usize,
    pub save_duration_ms: u128,
}

/// A workbook held in memory between open and save.
#[derive(Debug, Clone)]
pub struct XlsxDocument {
    path: PathBuf,
    /// `<cellXfs>` table shared by all sheets.
    styles: Vec<CellStyle>,
    sheets: Vec<XlsxSheet>,
}

impl XlsxDocument {
    /// Open a workbook (xlsx, xlsm, xls, xlsb or ods). Formats and layout are
    /// only read from xlsx/xlsm packages; other formats open with values only.
    pub fn open(path: &Path) -> Result<Self, XlsxError> {
        let start_time = Instant::now();

        let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| XlsxError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(XlsxError::NoSheets(path.to_path_buf()));
        }

        let WorkbookStyles { styles, sheets: layouts } = match read_workbook_styles(path, &sheet_names) {
            Ok(styles) => styles,
            Err(message) => {
                tracing::debug!(path = %path.display(), %message, "no package styles; values only");
                WorkbookStyles::default()
            }
        };
        let mut layouts = layouts.into_iter();

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let range = workbook.worksheet_range(name).map_err(|e| XlsxError::Read {
                sheet: name.clone(),
                message: e.to_string(),
            })?;

            let mut sheet = XlsxSheet {
                name: name.clone(),
                layout: layouts.next().unwrap_or_default(),
                ..Default::default()
            };

            // Range start offset (data may not begin at A1)
            let (start_row, start_col) = range.start().unwrap_or((0, 0));
            for (row_idx, row) in range.rows().enumerate() {
                for (col_idx, cell) in row.iter().enumerate() {
                    let value = cell_value(cell);
                    if value.is_blank() {
                        continue;
                    }
                    let address = Address {
                        col: start_col + col_idx as u32 + 1,
                        row: start_row + row_idx as u32 + 1,
                    };
                    sheet.values.insert(address, value);
                }
            }

            // Formula range may start at a different offset than data range
            if let Ok(formula_range) = workbook.worksheet_formula(name) {
                let (start_row, start_col) = formula_range.start().unwrap_or((0, 0));
                for (row_idx, row) in formula_range.rows().enumerate() {
                    for (col_idx, formula) in row.iter().enumerate() {
                        if formula.is_empty() {
                            continue;
                        }
                        let address = Address {
                            col: start_col + col_idx as u32 + 1,
                            row: start_row + row_idx as u32 + 1,
                        };
                        let text = if formula.starts_with('=') {
                            formula.clone()
                        } else {
                            format!("={formula}")
                        };
                        sheet.formulas.insert(address, text);
                    }
                }
            }

            tracing::debug!(
                sheet = %name,
                values = sheet.values.len(),
                formulas = sheet.formulas.len(),
                styled = sheet.layout.cell_styles.len(),
                merges = sheet.layout.merges.len(),
                "sheet loaded"
            );
            sheets.push(sheet);
        }

        tracing::info!(
            path = %path.display(),
            sheets = sheets.len(),
            styles = styles.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "workbook opened"
        );

        Ok(Self { path: path.to_path_buf(), styles, sheets })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The format a cell is saved with, before any run coloring.
    pub fn cell_style(&self, sheet: &str, address: Address) -> Option<&CellStyle> {
        let s = self.sheets.iter().find(|s| s.name == sheet)?;
        self.base_style(s, address)
    }

    /// Merged ranges of a sheet, in file order.
    pub fn merges(&self, sheet: &str) -> &[CellRange] {
        self.sheets
            .iter()
            .find(|s| s.name == sheet)
            .map(|s| s.layout.merges.as_slice())
            .unwrap_or_default()
    }

    /// Cells without a style of their own use the workbook's first entry,
    /// which carries the default font.
    fn base_style(&self, sheet: &XlsxSheet, address: Address) -> Option<&CellStyle> {
        match sheet.layout.cell_styles.get(&address) {
            Some(index) => self.styles.get(*index),
            None => self.styles.first(),
        }
    }

    /// Write the workbook to `path`, sheets in their original order.
    pub fn save(&self, path: &Path) -> Result<SaveResult, XlsxError> {
        let start_time = Instant::now();
        let mut result = SaveResult::default();
        let mut xlsx_workbook = XlsxWorkbook::new();

        for sheet in &self.sheets {
            let worksheet = xlsx_workbook
                .add_worksheet()
                .set_name(&sheet.name)
                .map_err(|e| XlsxError::Write {
                    sheet: sheet.name.clone(),
                    address: String::new(),
                    message: e.to_string(),
                })?;
            self.save_layout(sheet, worksheet, &mut result)?;
            self.save_cells(sheet, worksheet, &mut result)?;
            result.sheets_saved += 1;
        }

        xlsx_workbook.save(path).map_err(|e| XlsxError::Save {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        result.save_duration_ms = start_time.elapsed().as_millis();
        tracing::info!(
            path = %path.display(),
            cells = result.cells_saved,
            colored = result.colored_cells,
            merges = result.merged_ranges,
            "workbook saved"
        );
        Ok(result)
    }

    fn sheet(&self, name: &str) -> Result<&XlsxSheet, ReconError> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ReconError::MissingSheet(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut XlsxSheet, ReconError> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| ReconError::MissingSheet(name.to_string()))
    }

    fn format_for(&self, sheet: &XlsxSheet, address: Address, color: Option<Rgb>) -> Format {
        match self.base_style(sheet, address) {
            Some(style) => style.to_format(color),
            None => font_format(color),
        }
    }

    /// Column and row dimensions and formats, then merges. Cells are written
    /// afterwards and overwrite the blank cells a merge lays down.
    fn save_layout(&self, sheet: &XlsxSheet, worksheet: &mut Worksheet, result: &mut SaveResult) -> Result<(), XlsxError> {
        let layout = &sheet.layout;
        let write_err = |address: Address, e: rust_xlsxwriter::XlsxError| XlsxError::Write {
            sheet: sheet.name.clone(),
            address: address.to_string(),
            message: e.to_string(),
        };

        let columns: BTreeSet<u32> = layout.col_widths.keys().chain(layout.col_styles.keys()).copied().collect();
        for col in columns {
            let address = Address { col, row: 1 };
            let (_, c) = grid_position(&sheet.name, address)?;
            if let Some(width) = layout.col_widths.get(&col) {
                worksheet.set_column_width(c, *width).map_err(|e| write_err(address, e))?;
            }
            if let Some(style) = layout.col_styles.get(&col).and_then(|i| self.styles.get(*i)) {
                worksheet
                    .set_column_format(c, &style.to_format(None))
                    .map_err(|e| write_err(address, e))?;
            }
        }

        let rows: BTreeSet<u32> = layout.row_heights.keys().chain(layout.row_styles.keys()).copied().collect();
        for row in rows {
            let address = Address { col: 1, row };
            let (r, _) = grid_position(&sheet.name, address)?;
            if let Some(height) = layout.row_heights.get(&row) {
                worksheet.set_row_height(r, *height).map_err(|e| write_err(address, e))?;
            }
            if let Some(style) = layout.row_styles.get(&row).and_then(|i| self.styles.get(*i)) {
                worksheet
                    .set_row_format(r, &style.to_format(None))
                    .map_err(|e| write_err(address, e))?;
            }
        }

        for merge in layout.merges.iter().filter(|m| !m.is_single()) {
            let top_left = merge.top_left();
            let (first_row, first_col) = grid_position(&sheet.name, top_left)?;
            let (last_row, last_col) = grid_position(&sheet.name, merge.bottom_right())?;
            let format = self.format_for(sheet, top_left, None);
            worksheet
                .merge_range(first_row, first_col, last_row, last_col, "", &format)
                .map_err(|e| write_err(top_left, e))?;
            result.merged_ranges += 1;
        }

        Ok(())
    }

    fn save_cells(&self, sheet: &XlsxSheet, worksheet: &mut Worksheet, result: &mut SaveResult) -> Result<(), XlsxError> {
        let write_err = |address: Address, e: rust_xlsxwriter::XlsxError| XlsxError::Write {
            sheet: sheet.name.clone(),
            address: address.to_string(),
            message: e.to_string(),
        };

        let mut addresses: Vec<Address> = sheet
            .values
            .keys()
            .chain(sheet.formulas.keys())
            .chain(sheet.colors.keys())
            .chain(sheet.layout.cell_styles.keys())
            .copied()
            .collect();
        addresses.sort_by_key(|a| (a.row, a.col));
        addresses.dedup();

        for address in addresses {
            let (row, col) = grid_position(&sheet.name, address)?;
            let value = sheet.values.get(&address).unwrap_or(&CellValue::Empty);
            let color = sheet.colors.get(&address).copied();
            let format = self.format_for(sheet, address, color);

            if let Some(formula) = sheet.formulas.get(&address) {
                let source = formula.strip_prefix('=').unwrap_or(formula);
                let formula = Formula::new(source).set_result(value.display_text());
                worksheet
                    .write_formula_with_format(row, col, formula, &format)
                    .map_err(|e| write_err(address, e))?;
                result.formulas_saved += 1;
            } else {
                match value {
                    // Styled or colored blanks keep their borders and fills
                    CellValue::Empty => {
                        worksheet.write_blank(row, col, &format).map_err(|e| write_err(address, e))?;
                    }
                    CellValue::Text(s) => match sheet.spans.get(&address) {
                        Some((spans, span_color)) => {
                            let highlight = self.format_for(sheet, address, Some(*span_color));
                            let runs = split_runs(s, spans);
                            let segments: Vec<(&Format, &str)> = runs
                                .iter()
                                .map(|(colored, text)| (if *colored { &highlight } else { &format }, text.as_str()))
                                .collect();
                            if segments.len() > 1 {
                                worksheet
                                    .write_rich_string_with_format(row, col, &segments, &format)
                                    .map_err(|e| write_err(address, e))?;
                            } else {
                                // A single run cannot be a rich string
                                let whole = if runs.first().is_some_and(|(colored, _)| *colored) {
                                    &highlight
                                } else {
                                    &format
                                };
                                worksheet
                                    .write_string_with_format(row, col, s, whole)
                                    .map_err(|e| write_err(address, e))?;
                            }
                            result.colored_cells += 1;
                        }
                        None => {
                            worksheet
                                .write_string_with_format(row, col, s, &format)
                                .map_err(|e| write_err(address, e))?;
                        }
                    },
                    CellValue::Number(n) => {
                        worksheet
                            .write_number_with_format(row, col, *n, &format)
                            .map_err(|e| write_err(address, e))?;
                    }
                }
            }

            if color.is_some() {
                result.colored_cells += 1;
            }
            result.cells_saved += 1;
        }

        Ok(())
    }
}

/// Zero-based worksheet position, or a write error for addresses past
/// Excel's last row or column.
fn grid_position(sheet: &str, address: Address) -> Result<(u32, u16), XlsxError> {
    let outside = || XlsxError::Write {
        sheet: sheet.to_string(),
        address: address.to_string(),
        message: format!("outside the worksheet grid ({MAX_COLUMNS} columns, {MAX_ROWS} rows)"),
    };
    if address.row == 0 || address.row > MAX_ROWS || address.col == 0 || address.col > MAX_COLUMNS {
        return Err(outside());
    }
    let col = u16::try_from(address.col - 1).map_err(|_| outside())?;
    Ok((address.row - 1, col))
}

/// Reject writes the saved workbook could not hold.
fn check_grid(sheet: &str, range: &CellRange) -> Result<(), ReconError> {
    let corner = range.bottom_right();
    if corner.col > MAX_COLUMNS || corner.row > MAX_ROWS {
        return Err(ReconError::io(sheet, corner, "outside the worksheet grid"));
    }
    Ok(())
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        // Stored as TRUE/FALSE text, the way it displays
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => CellValue::Text(format!("#{e:?}")),
        // Dates compare and save as their serial number
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
    }
}

fn font_format(color: Option<Rgb>) -> Format {
    match color {
        Some(rgb) => Format::new().set_font_color(Color::RGB(rgb)),
        None => Format::new(),
    }
}

/// Split `text` into `(colored, segment)` runs at the span boundaries.
/// Offsets are in chars; empty runs are dropped.
fn split_runs(text: &str, spans: &[TextSpan]) -> Vec<(bool, String)> {
    let chars: Vec<char> = text.chars().collect();
    let mut colored = vec![false; chars.len()];
    for span in spans {
        let end = (span.start + span.len).min(chars.len());
        for flag in colored.iter_mut().take(end).skip(span.start) {
            *flag = true;
        }
    }

    let mut runs: Vec<(bool, String)> = Vec::new();
    for (ch, flag) in chars.into_iter().zip(colored) {
        match runs.last_mut() {
            Some((last, run)) if *last == flag => run.push(ch),
            _ => runs.push((flag, ch.to_string())),
        }
    }
    runs
}

impl Document for XlsxDocument {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn used_range(&self, sheet: &str) -> Result<Option<CellRange>, ReconError> {
        Ok(self.sheet(sheet)?.used_range())
    }

    fn read_range(&self, sheet: &str, range: &CellRange) -> Result<Grid, ReconError> {
        let s = self.sheet(sheet)?;
        let mut grid = Grid::blank(range);
        for (address, value) in s.values.iter().filter(|(a, _)| range.contains(**a)) {
            grid.set(*address, value.clone())?;
        }
        Ok(grid)
    }

    fn read_formulas(&self, sheet: &str, range: &CellRange) -> Result<Grid, ReconError> {
        let mut grid = self.read_range(sheet, range)?;
        let s = self.sheet(sheet)?;
        for (address, formula) in s.formulas.iter().filter(|(a, _)| range.contains(**a)) {
            grid.set(*address, CellValue::Text(formula.clone()))?;
        }
        Ok(grid)
    }

    fn write_range(&mut self, sheet: &str, range: &CellRange, values: &Grid) -> Result<(), ReconError> {
        check_grid(sheet, range)?;
        let s = self.sheet_mut(sheet)?;
        let top_left = range.top_left();
        for cell in range.cells() {
            let value = values
                .get((cell.row - top_left.row) as usize, (cell.col - top_left.col) as usize)
                .clone();
            s.formulas.remove(&cell);
            s.spans.remove(&cell);
            if value.is_blank() {
                s.values.remove(&cell);
            } else {
                s.values.insert(cell, value);
            }
        }
        Ok(())
    }

    fn set_font_color(&mut self, sheet: &str, range: &CellRange, color: Rgb) -> Result<(), ReconError> {
        check_grid(sheet, range)?;
        let s = self.sheet_mut(sheet)?;
        for cell in range.cells() {
            s.spans.remove(&cell);
            s.colors.insert(cell, color);
        }
        Ok(())
    }

    fn set_text_color(
        &mut self,
        sheet: &str,
        cell: Address,
        spans: &[TextSpan],
        color: Rgb,
    ) -> Result<(), ReconError> {
        let s = self.sheet_mut(sheet)?;
        if !matches!(s.values.get(&cell), Some(CellValue::Text(_))) || s.formulas.contains_key(&cell) {
            return Err(ReconError::io(sheet, cell, "span coloring needs a plain text cell"));
        }
        s.colors.remove(&cell);
        s.spans.insert(cell, (spans.to_vec(), color));
        Ok(())
    }

    fn column_width(&self, sheet: &str, col: u32) -> Result<Option<f64>, ReconError> {
        Ok(self.sheet(sheet)?.layout.col_widths.get(&col).copied())
    }

    fn set_column_width(&mut self, sheet: &str, col: u32, width: Option<f64>) -> Result<(), ReconError> {
        check_grid(sheet, &CellRange::single(Address { col, row: 1 }))?;
        let widths = &mut self.sheet_mut(sheet)?.layout.col_widths;
        match width {
            Some(width) => widths.insert(col, width),
            None => widths.remove(&col),
        };
        Ok(())
    }

    fn row_height(&self, sheet: &str, row: u32) -> Result<Option<f64>, ReconError> {
        Ok(self.sheet(sheet)?.layout.row_heights.get(&row).copied())
    }

    fn set_row_height(&mut self, sheet: &str, row: u32, height: Option<f64>) -> Result<(), ReconError> {
        check_grid(sheet, &CellRange::single(Address { col: 1, row }))?;
        let heights = &mut self.sheet_mut(sheet)?.layout.row_heights;
        match height {
            Some(height) => heights.insert(row, height),
            None => heights.remove(&row),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::{BorderLine, HAlign, NumberFormat};
    use plandiff_recon::RED;
    use rust_xlsxwriter::{FormatAlign, FormatBorder};

    fn a(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn r(s: &str) -> CellRange {
        CellRange::parse(s).unwrap()
    }

    /// Plan-like workbook: two sheets, text, numbers, one formula.
    fn write_fixture(path: &Path) {
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet().set_name("申請書").unwrap();
        sheet.write_string(0, 0, "森林経営計画").unwrap();
        sheet.write_number(4, 4, 12.5).unwrap();
        sheet.write_string(9, 4, "plan was drafted").unwrap();
        sheet.write_number(1, 2, 3.0).unwrap();
        sheet.write_formula(2, 2, Formula::new("C2*2").set_result("6")).unwrap();

        let other = workbook.add_worksheet().set_name("概要").unwrap();
        other.write_string(3, 1, "B4").unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn open_reads_values_and_formulas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xlsx");
        write_fixture(&path);

        let doc = XlsxDocument::open(&path).unwrap();
        assert_eq!(doc.sheet_names(), vec!["申請書".to_string(), "概要".to_string()]);

        let frame = doc.used_range("申請書").unwrap().unwrap();
        assert_eq!(frame.bottom_right(), a("E10"));

        let values = doc.read_range("申請書", &r("A1:E10")).unwrap();
        assert_eq!(values.cell(a("A1")), &CellValue::text("森林経営計画"));
        assert_eq!(values.cell(a("E5")), &CellValue::Number(12.5));

        let formulas = doc.read_formulas("申請書", &r("A1:E10")).unwrap();
        assert_eq!(formulas.cell(a("C3")), &CellValue::text("=C2*2"));
        assert_eq!(formulas.cell(a("C2")), &CellValue::Number(3.0));
    }

    #[test]
    fn unknown_sheet_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xlsx");
        write_fixture(&path);

        let doc = XlsxDocument::open(&path).unwrap();
        assert!(matches!(doc.used_range("nope"), Err(ReconError::MissingSheet(_))));
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = XlsxDocument::open(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, XlsxError::Open { .. }));
    }

    #[test]
    fn save_round_trips_written_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xlsx");
        write_fixture(&path);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let grid = Grid::new(a("E5"), vec![vec![CellValue::text("007")]]);
        doc.write_range("申請書", &r("E5"), &grid).unwrap();
        doc.set_font_color("申請書", &r("A1"), RED).unwrap();
        doc.set_text_color("申請書", a("E10"), &[TextSpan { start: 9, len: 7 }], RED)
            .unwrap();

        let out = dir.path().join("out.xlsx");
        let result = doc.save(&out).unwrap();
        assert_eq!(result.sheets_saved, 2);
        assert_eq!(result.formulas_saved, 1);
        assert_eq!(result.colored_cells, 2);

        let reopened = XlsxDocument::open(&out).unwrap();
        let values = reopened.read_range("申請書", &r("A1:E10")).unwrap();
        assert_eq!(values.cell(a("E5")), &CellValue::text("007"));
        assert_eq!(values.cell(a("E10")), &CellValue::text("plan was drafted"));
        let formulas = reopened.read_formulas("申請書", &r("C3")).unwrap();
        assert_eq!(formulas.cell(a("C3")), &CellValue::text("=C2*2"));
    }

    #[test]
    fn span_coloring_rejects_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xlsx");
        write_fixture(&path);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let err = doc
            .set_text_color("申請書", a("E5"), &[TextSpan { start: 0, len: 1 }], RED)
            .unwrap_err();
        assert!(matches!(err, ReconError::Io { .. }));
    }

    /// Formatted sheet: a bold centered merge, a wide column, a tall row,
    /// a dated cell, a filled cell and a bordered blank.
    fn write_formatted_fixture(path: &Path) {
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet().set_name("申請書").unwrap();
        let title = Format::new().set_bold().set_align(FormatAlign::Center);
        sheet.merge_range(0, 0, 0, 3, "森林経営計画書", &title).unwrap();
        sheet.set_column_width(1, 40).unwrap();
        sheet.set_row_height(1, 30).unwrap();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_number_with_format(2, 0, 45000.0, &date).unwrap();
        let filled = Format::new().set_background_color(Color::RGB(0xFFFF00));
        sheet.write_string_with_format(2, 1, "育成林", &filled).unwrap();
        let boxed = Format::new().set_border(FormatBorder::Thin);
        sheet.write_blank(4, 2, &boxed).unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn save_keeps_merges_formats_and_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xlsx");
        write_formatted_fixture(&path);

        let mut doc = XlsxDocument::open(&path).unwrap();
        doc.set_font_color("申請書", &r("A3"), RED).unwrap();
        let out = dir.path().join("out.xlsx");
        let result = doc.save(&out).unwrap();
        assert_eq!(result.merged_ranges, 1);

        let reopened = XlsxDocument::open(&out).unwrap();
        assert_eq!(reopened.merges("申請書"), &[r("A1:D1")]);
        assert_eq!(reopened.column_width("申請書", 2).unwrap(), Some(40.0));
        assert_eq!(reopened.column_width("申請書", 3).unwrap(), None);
        assert_eq!(reopened.row_height("申請書", 2).unwrap(), Some(30.0));

        let title = reopened.cell_style("申請書", a("A1")).unwrap();
        assert!(title.bold);
        assert_eq!(title.horizontal, Some(HAlign::Center));

        // Marking swaps the font color and keeps the date format
        let dated = reopened.cell_style("申請書", a("A3")).unwrap();
        assert_eq!(dated.number_format, Some(NumberFormat::Custom("yyyy-mm-dd".to_string())));
        assert_eq!(dated.font_color, Some(RED));
        let values = reopened.read_range("申請書", &r("A3:B3")).unwrap();
        assert_eq!(values.cell(a("A3")), &CellValue::Number(45000.0));

        assert_eq!(reopened.cell_style("申請書", a("B3")).unwrap().fill, Some(0xFFFF00));
        assert_eq!(reopened.cell_style("申請書", a("C5")).unwrap().bottom.line, BorderLine::Thin);
    }

    #[test]
    fn dimensions_are_editable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xlsx");
        write_formatted_fixture(&path);

        let mut doc = XlsxDocument::open(&path).unwrap();
        doc.set_column_width("申請書", 2, None).unwrap();
        doc.set_column_width("申請書", 5, Some(12.0)).unwrap();
        doc.set_row_height("申請書", 7, Some(24.0)).unwrap();

        let out = dir.path().join("out.xlsx");
        doc.save(&out).unwrap();
        let reopened = XlsxDocument::open(&out).unwrap();
        assert_eq!(reopened.column_width("申請書", 2).unwrap(), None);
        assert_eq!(reopened.column_width("申請書", 5).unwrap(), Some(12.0));
        assert_eq!(reopened.row_height("申請書", 7).unwrap(), Some(24.0));
    }

    #[test]
    fn writes_past_the_last_column_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xlsx");
        write_fixture(&path);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let beyond = Address { col: MAX_COLUMNS + 1, row: 1 };
        let grid = Grid::new(beyond, vec![vec![CellValue::text("x")]]);
        let err = doc.write_range("申請書", &CellRange::single(beyond), &grid).unwrap_err();
        assert!(matches!(err, ReconError::Io { .. }));

        assert!(grid_position("申請書", Address { col: MAX_COLUMNS, row: 1 }).is_ok());
        let err = grid_position("申請書", beyond).unwrap_err();
        assert!(matches!(err, XlsxError::Write { .. }));
    }

    #[test]
    fn split_runs_follows_spans() {
        let runs = split_runs("計画を変更した", &[TextSpan { start: 3, len: 2 }]);
        assert_eq!(
            runs,
            vec![
                (false, "計画を".to_string()),
                (true, "変更".to_string()),
                (false, "した".to_string()),
            ]
        );
    }
}
