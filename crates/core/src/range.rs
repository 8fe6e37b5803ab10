//! Rectangular ranges and their algebra.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::address::Address;
use crate::error::AddressError;

/// A normalized rectangle: `start` is top-left, `end` is bottom-right.
/// A single address is a 1x1 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    start: Address,
    end: Address,
}

/// 0-based offsets of a range relative to an anchor's top-left cell.
/// All bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeRect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl RelativeRect {
    pub fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn width(&self) -> usize {
        self.right - self.left + 1
    }
}

impl CellRange {
    /// Build a range from two corners given in any order.
    pub fn new(a: Address, b: Address) -> Self {
        Self {
            start: Address { col: a.col.min(b.col), row: a.row.min(b.row) },
            end: Address { col: a.col.max(b.col), row: a.row.max(b.row) },
        }
    }

    pub fn single(a: Address) -> Self {
        Self { start: a, end: a }
    }

    /// Parse `A1` or `A1:C3` (corners may be given in any order).
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let parts: Vec<&str> = text.split(':').collect();
        match parts.as_slice() {
            [single] => Ok(Self::single(Address::parse(single)?)),
            [a, b] => Ok(Self::new(Address::parse(a)?, Address::parse(b)?)),
            _ => Err(AddressError::InvalidRange(text.to_string())),
        }
    }

    pub fn top_left(&self) -> Address {
        self.start
    }

    pub fn bottom_right(&self) -> Address {
        self.end
    }

    pub fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, a: Address) -> bool {
        (self.start.col..=self.end.col).contains(&a.col)
            && (self.start.row..=self.end.row).contains(&a.row)
    }

    /// Minimal range containing both `self` and `other`.
    pub fn union(&self, other: &CellRange) -> CellRange {
        CellRange {
            start: Address {
                col: self.start.col.min(other.start.col),
                row: self.start.row.min(other.start.row),
            },
            end: Address {
                col: self.end.col.max(other.end.col),
                row: self.end.row.max(other.end.row),
            },
        }
    }

    /// Minimal range covering every range in `ranges`; `None` when empty.
    pub fn bounding<'a, I>(ranges: I) -> Option<CellRange>
    where
        I: IntoIterator<Item = &'a CellRange>,
    {
        ranges
            .into_iter()
            .fold(None, |acc: Option<CellRange>, r| match acc {
                Some(a) => Some(a.union(r)),
                None => Some(*r),
            })
    }

    /// Shift both corners. A corner pushed past column 1 or row 1 is
    /// clamped and a warning is logged.
    pub fn translate(&self, d_col: i64, d_row: i64) -> CellRange {
        let (start, start_clamped) = self.start.offset(d_col, d_row);
        let (end, end_clamped) = self.end.offset(d_col, d_row);
        if start_clamped || end_clamped {
            tracing::warn!(
                range = %self,
                d_col,
                d_row,
                "translation crosses the sheet edge; clamped to column A / row 1"
            );
        }
        CellRange::new(start, end)
    }

    /// Project into 0-based offsets relative to `anchor`.
    pub fn relative_location(&self, anchor: Address) -> Result<RelativeRect, AddressError> {
        if self.start.col < anchor.col || self.start.row < anchor.row {
            return Err(AddressError::OutOfBounds {
                range: self.to_string(),
                anchor: anchor.to_string(),
            });
        }
        Ok(RelativeRect {
            top: (self.start.row - anchor.row) as usize,
            left: (self.start.col - anchor.col) as usize,
            bottom: (self.end.row - anchor.row) as usize,
            right: (self.end.col - anchor.col) as usize,
        })
    }

    /// Every cell of the range, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Address> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| Address { col, row })
        })
    }
}

impl From<Address> for CellRange {
    fn from(a: Address) -> Self {
        CellRange::single(a)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRange::parse(s)
    }
}

impl Serialize for CellRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
