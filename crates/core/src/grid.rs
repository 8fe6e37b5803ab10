//! In-memory value grids and the range comparator.
//!
//! A `Grid` is a snapshot of a rectangle of one document, anchored at its
//! top-left address. Reads outside the captured rectangle (below or to the
//! right) yield blanks, since cells beyond the used range are blank.

use crate::address::Address;
use crate::error::AddressError;
use crate::range::{CellRange, RelativeRect};
use crate::value::CellValue;

static BLANK: CellValue = CellValue::Empty;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    origin: Address,
    width: usize,
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    /// Build a grid from row vectors; short rows are padded with blanks.
    pub fn new(origin: Address, rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { origin, width, rows }
    }

    /// A grid of blanks covering `range`.
    pub fn blank(range: &CellRange) -> Self {
        let rows = vec![vec![CellValue::Empty; range.width() as usize]; range.height() as usize];
        Self::new(range.top_left(), rows)
    }

    pub fn origin(&self) -> Address {
        self.origin
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Value at 0-based offsets from the origin; blank when outside.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&BLANK)
    }

    /// Value at an absolute address; blank when outside the grid.
    pub fn cell(&self, a: Address) -> &CellValue {
        if a.col < self.origin.col || a.row < self.origin.row {
            return &BLANK;
        }
        self.get((a.row - self.origin.row) as usize, (a.col - self.origin.col) as usize)
    }

    pub fn set(&mut self, a: Address, value: CellValue) -> Result<(), AddressError> {
        let rel = CellRange::single(a).relative_location(self.origin)?;
        if rel.top >= self.rows.len() {
            self.rows.resize(rel.top + 1, vec![CellValue::Empty; self.width]);
        }
        if rel.left >= self.width {
            self.width = rel.left + 1;
            for row in &mut self.rows {
                row.resize(self.width, CellValue::Empty);
            }
        }
        self.rows[rel.top][rel.left] = value;
        Ok(())
    }

    /// Slice by relative offsets. Cells beyond the grid read as blank.
    pub fn extract(&self, rel: RelativeRect) -> Grid {
        let rows = (rel.top..=rel.bottom)
            .map(|r| (rel.left..=rel.right).map(|c| self.get(r, c).clone()).collect())
            .collect();
        let origin = Address {
            col: self.origin.col + rel.left as u32,
            row: self.origin.row + rel.top as u32,
        };
        Grid::new(origin, rows)
    }

    /// Sub-grid covering `range`, used to fetch replacement values.
    pub fn value_at(&self, range: &CellRange) -> Result<Grid, AddressError> {
        let rel = range.relative_location(self.origin)?;
        Ok(self.extract(rel))
    }

    /// Apply `f` to every value, keeping the shape.
    pub fn map(&self, f: impl Fn(&CellValue) -> CellValue) -> Grid {
        Grid {
            origin: self.origin,
            width: self.width,
            rows: self.rows.iter().map(|row| row.iter().map(&f).collect()).collect(),
        }
    }

    /// Every non-blank cell with its address.
    pub fn iter_filled(&self) -> impl Iterator<Item = (Address, &CellValue)> {
        self.rows.iter().enumerate().flat_map(move |(r, row)| {
            row.iter().enumerate().filter(|(_, v)| !v.is_blank()).map(move |(c, v)| {
                (
                    Address { col: self.origin.col + c as u32, row: self.origin.row + r as u32 },
                    v,
                )
            })
        })
    }
}

/// Compare `range` in two grids, each projected against its own origin.
pub fn regions_equal(a: &Grid, b: &Grid, range: &CellRange) -> Result<bool, AddressError> {
    let left = a.value_at(range)?;
    let right = b.value_at(range)?;
    Ok(left.rows == right.rows)
}
