//! Cell addresses and column-letter encoding.
//!
//! Columns use bijective base-26: `A`..`Z` are 1..26, `AA` is 27, `ZZ` is
//! 702, `AAA` is 703. There is no zero digit.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::AddressError;

/// Convert column letters to a 1-based column number.
///
/// Only `A`..`Z` are accepted; absolute markers must be stripped first.
pub fn column_to_number(letters: &str) -> Result<u32, AddressError> {
    if letters.is_empty() {
        return Err(AddressError::InvalidAddress(letters.to_string()));
    }
    let mut n: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_uppercase() {
            return Err(AddressError::InvalidAddress(letters.to_string()));
        }
        let digit = (ch as u32) - ('A' as u32) + 1;
        n = n
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| AddressError::InvalidAddress(letters.to_string()))?;
    }
    Ok(n)
}

/// Convert a 1-based column number to letters. `0` yields an empty string.
pub fn number_to_column(col: u32) -> String {
    let mut out = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// A single cell location, 1-based on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub col: u32,
    pub row: u32,
}

impl Address {
    pub fn new(col: u32, row: u32) -> Result<Self, AddressError> {
        if col == 0 || row == 0 {
            return Err(AddressError::InvalidAddress(format!("col {col}, row {row}")));
        }
        Ok(Self { col, row })
    }

    /// Parse `A1`, `$A$1`, `AJ45`. Lowercase letters are rejected.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let cleaned: String = text.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(cleaned.len());
        let (letters, digits) = cleaned.split_at(split);

        let col = column_to_number(letters)
            .map_err(|_| AddressError::InvalidAddress(text.to_string()))?;

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AddressError::InvalidAddress(text.to_string()));
        }
        let row: u32 = digits
            .parse()
            .map_err(|_| AddressError::InvalidAddress(text.to_string()))?;
        if row == 0 {
            return Err(AddressError::InvalidAddress(text.to_string()));
        }

        Ok(Self { col, row })
    }

    pub fn column_letters(&self) -> String {
        number_to_column(self.col)
    }

    /// Shift by a signed offset. Coordinates that would drop below 1 are
    /// clamped to 1; the second element reports whether clamping happened.
    pub fn offset(&self, d_col: i64, d_row: i64) -> (Address, bool) {
        let (col, col_clamped) = clamp_axis(self.col, d_col);
        let (row, row_clamped) = clamp_axis(self.row, d_row);
        (Address { col, row }, col_clamped || row_clamped)
    }
}

fn clamp_axis(value: u32, delta: i64) -> (u32, bool) {
    let moved = value as i64 + delta;
    if moved < 1 {
        (1, true)
    } else {
        (moved.min(u32::MAX as i64) as u32, false)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", number_to_column(self.col), self.row)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
