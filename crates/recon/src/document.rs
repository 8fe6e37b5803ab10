//! The document collaborator seam.
//!
//! The engine never opens files. It reads and writes through [`Document`],
//! implemented by the xlsx backend in `plandiff-io` and by
//! [`MemoryDocument`] for tests and embedding.

use std::collections::HashMap;

use plandiff_core::{column_to_number, Address, CellRange, CellValue, Grid};

use crate::error::ReconError;
use crate::text_diff::TextSpan;

/// Font color as `0xRRGGBB`.
pub type Rgb = u32;

pub const RED: Rgb = 0xFF0000;

pub trait Document {
    fn sheet_names(&self) -> Vec<String>;

    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names().iter().any(|s| s == sheet)
    }

    /// Bounding range of every non-blank cell; `None` for an empty sheet.
    fn used_range(&self, sheet: &str) -> Result<Option<CellRange>, ReconError>;

    /// Values only. Formula cells read as their cached result.
    fn read_range(&self, sheet: &str, range: &CellRange) -> Result<Grid, ReconError>;

    /// Formula text (with leading `=`) where a cell holds a formula, the
    /// plain value everywhere else.
    fn read_formulas(&self, sheet: &str, range: &CellRange) -> Result<Grid, ReconError>;

    fn write_range(&mut self, sheet: &str, range: &CellRange, values: &Grid) -> Result<(), ReconError>;

    fn set_font_color(&mut self, sheet: &str, range: &CellRange, color: Rgb) -> Result<(), ReconError>;

    /// Color only the given character spans of a text cell.
    fn set_text_color(
        &mut self,
        sheet: &str,
        cell: Address,
        spans: &[TextSpan],
        color: Rgb,
    ) -> Result<(), ReconError>;

    /// Custom width of a column; `None` when it uses the sheet default.
    fn column_width(&self, sheet: &str, col: u32) -> Result<Option<f64>, ReconError>;

    fn set_column_width(&mut self, sheet: &str, col: u32, width: Option<f64>) -> Result<(), ReconError>;

    /// Custom height of a row in points; `None` when it uses the sheet default.
    fn row_height(&self, sheet: &str, row: u32) -> Result<Option<f64>, ReconError>;

    fn set_row_height(&mut self, sheet: &str, row: u32, height: Option<f64>) -> Result<(), ReconError>;
}

// ---------------------------------------------------------------------------
// In-memory document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct MemorySheet {
    name: String,
    values: Grid,
    formulas: HashMap<Address, String>,
    colors: HashMap<Address, Rgb>,
    spans: HashMap<Address, (Vec<TextSpan>, Rgb)>,
    col_widths: HashMap<u32, f64>,
    row_heights: HashMap<u32, f64>,
}

/// A document held entirely in memory. Counts writes so callers can assert
/// that an operation did or did not touch it.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    sheets: Vec<MemorySheet>,
    writes: usize,
}

fn origin() -> Address {
    Address { col: 1, row: 1 }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet whose values are laid out from `values.origin()`.
    pub fn with_sheet(mut self, name: &str, values: &Grid) -> Result<Self, ReconError> {
        let mut grid = Grid::new(origin(), Vec::new());
        for (address, value) in values.iter_filled() {
            grid.set(address, value.clone())?;
        }
        self.sheets.push(MemorySheet {
            name: name.to_string(),
            values: grid,
            formulas: HashMap::new(),
            colors: HashMap::new(),
            spans: HashMap::new(),
            col_widths: HashMap::new(),
            row_heights: HashMap::new(),
        });
        Ok(self)
    }

    /// Add a sheet from `(address, value)` pairs.
    pub fn with_cells(self, name: &str, cells: &[(&str, CellValue)]) -> Result<Self, ReconError> {
        let mut grid = Grid::new(origin(), Vec::new());
        for (address, value) in cells {
            grid.set(Address::parse(address)?, value.clone())?;
        }
        self.with_sheet(name, &grid)
    }

    pub fn with_formula(mut self, sheet: &str, address: &str, formula: &str) -> Result<Self, ReconError> {
        let a = Address::parse(address)?;
        let s = self.sheet_mut(sheet)?;
        s.formulas.insert(a, formula.to_string());
        Ok(self)
    }

    pub fn with_column_width(mut self, sheet: &str, column: &str, width: f64) -> Result<Self, ReconError> {
        let col = column_to_number(column)?;
        self.sheet_mut(sheet)?.col_widths.insert(col, width);
        Ok(self)
    }

    pub fn with_row_height(mut self, sheet: &str, row: u32, height: f64) -> Result<Self, ReconError> {
        self.sheet_mut(sheet)?.row_heights.insert(row, height);
        Ok(self)
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn value(&self, sheet: &str, address: Address) -> Option<&CellValue> {
        self.sheet(sheet).ok().map(|s| s.values.cell(address))
    }

    pub fn font_color(&self, sheet: &str, address: Address) -> Option<Rgb> {
        self.sheet(sheet).ok().and_then(|s| s.colors.get(&address).copied())
    }

    pub fn colored_spans(&self, sheet: &str, address: Address) -> Option<&[TextSpan]> {
        self.sheet(sheet)
            .ok()
            .and_then(|s| s.spans.get(&address).map(|(spans, _)| spans.as_slice()))
    }

    pub fn span_color(&self, sheet: &str, address: Address) -> Option<Rgb> {
        self.sheet(sheet).ok().and_then(|s| s.spans.get(&address).map(|(_, color)| *color))
    }

    /// Every colored cell of a sheet, row-major.
    pub fn colored_cells(&self, sheet: &str) -> Vec<Address> {
        let Ok(s) = self.sheet(sheet) else {
            return Vec::new();
        };
        let mut cells: Vec<Address> = s.colors.keys().chain(s.spans.keys()).copied().collect();
        cells.sort_by_key(|a| (a.row, a.col));
        cells.dedup();
        cells
    }

    fn sheet(&self, name: &str) -> Result<&MemorySheet, ReconError> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ReconError::MissingSheet(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut MemorySheet, ReconError> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| ReconError::MissingSheet(name.to_string()))
    }
}

impl Document for MemoryDocument {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn used_range(&self, sheet: &str) -> Result<Option<CellRange>, ReconError> {
        let s = self.sheet(sheet)?;
        let filled: Vec<CellRange> = s
            .values
            .iter_filled()
            .map(|(a, _)| CellRange::single(a))
            .chain(s.formulas.keys().map(|a| CellRange::single(*a)))
            .collect();
        Ok(CellRange::bounding(&filled))
    }

    fn read_range(&self, sheet: &str, range: &CellRange) -> Result<Grid, ReconError> {
        Ok(self.sheet(sheet)?.values.value_at(range)?)
    }

    fn read_formulas(&self, sheet: &str, range: &CellRange) -> Result<Grid, ReconError> {
        let s = self.sheet(sheet)?;
        let mut grid = s.values.value_at(range)?;
        for (address, formula) in &s.formulas {
            if range.contains(*address) {
                grid.set(*address, CellValue::Text(formula.clone()))?;
            }
        }
        Ok(grid)
    }

    fn write_range(&mut self, sheet: &str, range: &CellRange, values: &Grid) -> Result<(), ReconError> {
        let s = self.sheet_mut(sheet)?;
        let top_left = range.top_left();
        for cell in range.cells() {
            let value = values
                .get((cell.row - top_left.row) as usize, (cell.col - top_left.col) as usize)
                .clone();
            s.values.set(cell, value)?;
            s.formulas.remove(&cell);
        }
        self.writes += 1;
        Ok(())
    }

    fn set_font_color(&mut self, sheet: &str, range: &CellRange, color: Rgb) -> Result<(), ReconError> {
        let s = self.sheet_mut(sheet)?;
        for cell in range.cells() {
            s.spans.remove(&cell);
            s.colors.insert(cell, color);
        }
        self.writes += 1;
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
        if s.values.cell(cell).as_text().is_none() {
            return Err(ReconError::io(sheet, cell, "span coloring needs a text cell"));
        }
        s.colors.remove(&cell);
        s.spans.insert(cell, (spans.to_vec(), color));
        self.writes += 1;
        Ok(())
    }

    fn column_width(&self, sheet: &str, col: u32) -> Result<Option<f64>, ReconError> {
        Ok(self.sheet(sheet)?.col_widths.get(&col).copied())
    }

    fn set_column_width(&mut self, sheet: &str, col: u32, width: Option<f64>) -> Result<(), ReconError> {
        let s = self.sheet_mut(sheet)?;
        match width {
            Some(w) => s.col_widths.insert(col, w),
            None => s.col_widths.remove(&col),
        };
        self.writes += 1;
        Ok(())
    }

    fn row_height(&self, sheet: &str, row: u32) -> Result<Option<f64>, ReconError> {
        Ok(self.sheet(sheet)?.row_heights.get(&row).copied())
    }

    fn set_row_height(&mut self, sheet: &str, row: u32, height: Option<f64>) -> Result<(), ReconError> {
        let s = self.sheet_mut(sheet)?;
        match height {
            Some(h) => s.row_heights.insert(row, h),
            None => s.row_heights.remove(&row),
        };
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn used_range_covers_filled_cells() {
        let doc = MemoryDocument::new()
            .with_cells("s", &[("C3", "x".into()), ("E9", 1.0.into())])
            .unwrap();
        assert_eq!(doc.used_range("s").unwrap().unwrap().to_string(), "C3:E9");
    }

    #[test]
    fn empty_sheet_has_no_used_range() {
        let doc = MemoryDocument::new().with_cells("s", &[]).unwrap();
        assert!(doc.used_range("s").unwrap().is_none());
    }

    #[test]
    fn missing_sheet_is_reported() {
        let doc = MemoryDocument::new();
        assert!(matches!(doc.used_range("nope"), Err(ReconError::MissingSheet(_))));
    }

    #[test]
    fn formulas_overlay_values() {
        let doc = MemoryDocument::new()
            .with_cells("s", &[("A1", 2.0.into()), ("A2", 4.0.into())])
            .unwrap()
            .with_formula("s", "A2", "=A1*2")
            .unwrap();
        let range = CellRange::parse("A1:A2").unwrap();
        let grid = doc.read_formulas("s", &range).unwrap();
        assert_eq!(grid.get(0, 0), &CellValue::Number(2.0));
        assert_eq!(grid.get(1, 0), &CellValue::text("=A1*2"));
        let values = doc.read_range("s", &range).unwrap();
        assert_eq!(values.get(1, 0), &CellValue::Number(4.0));
    }

    #[test]
    fn with_sheet_keeps_grid_offset() {
        let grid = Grid::new(a("C3"), vec![vec!["x".into()]]);
        let doc = MemoryDocument::new().with_sheet("s", &grid).unwrap();
        assert_eq!(doc.value("s", a("C3")), Some(&CellValue::text("x")));
        assert_eq!(doc.used_range("s").unwrap().unwrap().to_string(), "C3");
    }

    #[test]
    fn text_color_keeps_color_and_needs_text() {
        let mut doc = MemoryDocument::new()
            .with_cells("s", &[("A1", "plan".into()), ("A2", 3.0.into())])
            .unwrap();
        let spans = [TextSpan { start: 0, len: 2 }];
        doc.set_text_color("s", a("A1"), &spans, 0x00FF00).unwrap();
        assert_eq!(doc.span_color("s", a("A1")), Some(0x00FF00));

        let err = doc.set_text_color("s", a("A2"), &spans, RED).unwrap_err();
        assert!(matches!(err, ReconError::Io { .. }));
    }

    #[test]
    fn dimensions_default_to_none() {
        let mut doc = MemoryDocument::new()
            .with_cells("s", &[])
            .unwrap()
            .with_column_width("s", "B", 20.0)
            .unwrap();
        assert_eq!(doc.column_width("s", 2).unwrap(), Some(20.0));
        assert_eq!(doc.row_height("s", 4).unwrap(), None);
        doc.set_row_height("s", 4, Some(30.0)).unwrap();
        doc.set_column_width("s", 2, None).unwrap();
        assert_eq!(doc.row_height("s", 4).unwrap(), Some(30.0));
        assert_eq!(doc.column_width("s", 2).unwrap(), None);
    }

    #[test]
    fn write_range_counts_writes() {
        let mut doc = MemoryDocument::new().with_cells("s", &[]).unwrap();
        let range = CellRange::parse("B2:C2").unwrap();
        let values = Grid::new(a("B2"), vec![vec!["x".into(), "y".into()]]);
        doc.write_range("s", &range, &values).unwrap();
        assert_eq!(doc.writes(), 1);
        assert_eq!(doc.value("s", a("C2")), Some(&CellValue::text("y")));
    }
}
