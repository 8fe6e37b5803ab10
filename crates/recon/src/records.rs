//! Row reconciliation.
//!
//! Rows of a record table (one forest parcel per row, say) are grouped by a
//! key derived from leading key columns, then paired within each group by
//! repeatedly taking the globally closest remaining pair. Ties go to the
//! lower target row, then the lower reference row.

use std::collections::HashMap;

use bitvec::prelude::*;
use plandiff_core::{number_to_column, Address, CellRange, CellValue, Grid};
use serde::Serialize;

use crate::error::ReconError;
use crate::model::{MatchedRecord, RecordAlignment};

const KEY_SEPARATOR: &str = "-";

/// Layout of a record table. Columns are absolute, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordTable {
    /// First data row (the row after the header block).
    pub first_row: u32,
    /// Columns reported when a difference is found. Their span is the
    /// window every record is read over.
    pub check_columns: Vec<u32>,
    /// Ordered columns whose leading non-blank run forms the group key.
    pub key_columns: Vec<u32>,
    /// Columns counted when scoring how far apart two rows are.
    pub compare_columns: Vec<u32>,
}

impl RecordTable {
    /// Inclusive `(first, last)` column of the record window.
    pub fn window(&self) -> (u32, u32) {
        let first = self.check_columns.iter().copied().min().unwrap_or(1);
        let last = self.check_columns.iter().copied().max().unwrap_or(first);
        (first, last)
    }

    fn window_label(&self) -> String {
        let (first, last) = self.window();
        format!("{}:{}", number_to_column(first), number_to_column(last))
    }
}

/// One row of a record table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub row: u32,
    pub key: String,
    first_col: u32,
    values: Vec<CellValue>,
}

impl Record {
    pub fn value(&self, col: u32) -> Option<&CellValue> {
        col.checked_sub(self.first_col)
            .and_then(|i| self.values.get(i as usize))
    }

    fn value_in(&self, col: u32, table: &RecordTable) -> Result<&CellValue, ReconError> {
        self.value(col).ok_or_else(|| {
            let err = ReconError::ColumnOutsideWindow {
                column: number_to_column(col),
                row: self.row,
                window: table.window_label(),
            };
            tracing::error!(address = %format!("{}{}", number_to_column(col), self.row), "{err}");
            err
        })
    }
}

/// Join the first contiguous run of non-blank values with `-`.
/// Numbers contribute their integer part.
pub fn group_key<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a CellValue>,
{
    values
        .into_iter()
        .map_while(CellValue::key_fragment)
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Read rows `first_row..=last_row` of the window. Rows that are blank
/// across the whole window are dropped.
pub fn extract_records(grid: &Grid, table: &RecordTable, last_row: u32) -> Result<Vec<Record>, ReconError> {
    let (first_col, last_col) = table.window();
    let mut records = Vec::new();

    for row in table.first_row..=last_row {
        let values: Vec<CellValue> = (first_col..=last_col)
            .map(|col| grid.cell(Address { col, row }).clone())
            .collect();
        if values.iter().all(CellValue::is_blank) {
            continue;
        }

        let mut record = Record { row, key: String::new(), first_col, values };
        let key_values = table
            .key_columns
            .iter()
            .map(|col| record.value_in(*col, table))
            .collect::<Result<Vec<_>, _>>()?;
        record.key = group_key(key_values);
        records.push(record);
    }

    Ok(records)
}

/// Number of compare columns where the two rows differ.
pub fn distance(target: &Record, reference: &Record, table: &RecordTable) -> Result<usize, ReconError> {
    let mut d = 0;
    for col in &table.compare_columns {
        if target.value_in(*col, table)? != reference.value_in(*col, table)? {
            d += 1;
        }
    }
    Ok(d)
}

/// Pair target rows with reference rows, group by group, in order of each
/// key's first appearance in the target.
pub fn align_records(
    target: &[Record],
    reference: &[Record],
    table: &RecordTable,
) -> Result<RecordAlignment, ReconError> {
    let mut key_order: Vec<&str> = Vec::new();
    let mut target_groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, record) in target.iter().enumerate() {
        let entry = target_groups.entry(record.key.as_str()).or_default();
        if entry.is_empty() {
            key_order.push(record.key.as_str());
        }
        entry.push(i);
    }

    let mut reference_groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, record) in reference.iter().enumerate() {
        reference_groups.entry(record.key.as_str()).or_default().push(j);
    }

    let mut alignment = RecordAlignment::default();
    let mut reference_used = bitvec![0; reference.len()];

    for key in key_order {
        let ts = &target_groups[key];
        let rs: &[usize] = reference_groups.get(key).map_or(&[][..], Vec::as_slice);

        let mut matrix = Vec::with_capacity(ts.len());
        for &t in ts {
            let row = rs
                .iter()
                .map(|&r| distance(&target[t], &reference[r], table))
                .collect::<Result<Vec<_>, _>>()?;
            matrix.push(row);
        }

        let mut live_t = bitvec![1; ts.len()];
        let mut live_r = bitvec![1; rs.len()];

        while live_t.any() && live_r.any() {
            let mut best: Option<(usize, usize, usize)> = None;
            for i in live_t.iter_ones() {
                for j in live_r.iter_ones() {
                    let d = matrix[i][j];
                    if best.map_or(true, |(bd, _, _)| d < bd) {
                        best = Some((d, i, j));
                    }
                }
            }
            let Some((d, i, j)) = best else { break };

            let (t, r) = (&target[ts[i]], &reference[rs[j]]);
            tracing::debug!(key, target_row = t.row, reference_row = r.row, distance = d, "paired records");
            alignment.matched.push(MatchedRecord {
                target_row: t.row,
                reference_row: r.row,
                distance: d,
            });
            live_t.set(i, false);
            live_r.set(j, false);
            reference_used.set(rs[j], true);
        }

        for i in live_t.iter_ones() {
            tracing::debug!(key, target_row = target[ts[i]].row, "record has no counterpart");
            alignment.inserted.push(target[ts[i]].row);
        }
    }

    alignment.deleted = reference_used
        .iter_zeros()
        .map(|j| reference[j].row)
        .collect();

    Ok(alignment)
}

/// Target addresses that must be surfaced for an alignment, one key group
/// at a time in order of the key's first appearance in the target: the
/// group's matched pairs (differing check columns) followed by the group's
/// inserted rows (the whole check span).
pub fn changed_addresses(
    target: &[Record],
    reference: &[Record],
    alignment: &RecordAlignment,
    table: &RecordTable,
) -> Result<Vec<CellRange>, ReconError> {
    let target_by_row: HashMap<u32, &Record> = target.iter().map(|r| (r.row, r)).collect();
    let reference_by_row: HashMap<u32, &Record> = reference.iter().map(|r| (r.row, r)).collect();
    let key_of = |row: u32| target_by_row.get(&row).map(|r| r.key.as_str());

    let mut key_order: Vec<&str> = Vec::new();
    for record in target {
        if !key_order.contains(&record.key.as_str()) {
            key_order.push(record.key.as_str());
        }
    }

    let mut changed = Vec::new();
    for key in key_order {
        for pair in alignment.matched.iter().filter(|p| key_of(p.target_row) == Some(key)) {
            let (Some(t), Some(r)) = (
                target_by_row.get(&pair.target_row),
                reference_by_row.get(&pair.reference_row),
            ) else {
                continue;
            };
            for &col in &table.check_columns {
                if t.value_in(col, table)? != r.value_in(col, table)? {
                    changed.push(CellRange::single(Address { col, row: t.row }));
                }
            }
        }

        if table.check_columns.is_empty() {
            continue;
        }
        let (first, last) = table.window();
        for &row in alignment.inserted.iter().filter(|row| key_of(**row) == Some(key)) {
            changed.push(CellRange::new(Address { col: first, row }, Address { col: last, row }));
        }
    }

    Ok(changed)
}

/// Full pipeline for one sheet's record table.
pub fn reconcile_records(
    target: &Grid,
    reference: &Grid,
    table: &RecordTable,
    last_row: u32,
) -> Result<(RecordAlignment, Vec<CellRange>), ReconError> {
    let target_records = extract_records(target, table, last_row)?;
    let reference_records = extract_records(reference, table, last_row)?;
    let alignment = align_records(&target_records, &reference_records, table)?;
    let changed = changed_addresses(&target_records, &reference_records, &alignment, table)?;
    Ok((alignment, changed))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Columns: A=key1, B=key2, C=volume, D=area, E=note (check A..E, compare C..D)
    fn table() -> RecordTable {
        RecordTable {
            first_row: 2,
            check_columns: vec![1, 2, 3, 4, 5],
            key_columns: vec![1, 2],
            compare_columns: vec![3, 4],
        }
    }

    fn v(s: &str) -> CellValue {
        if s.is_empty() {
            CellValue::Empty
        } else if let Ok(n) = s.parse::<f64>() {
            CellValue::Number(n)
        } else {
            CellValue::text(s)
        }
    }

    /// Grid with a header row at 1 and data from row 2.
    fn grid(rows: &[[&str; 5]]) -> Grid {
        let mut all = vec![["k1", "k2", "vol", "area", "note"].iter().map(|s| v(s)).collect::<Vec<_>>()];
        all.extend(rows.iter().map(|r| r.iter().map(|s| v(s)).collect()));
        Grid::new(Address { col: 1, row: 1 }, all)
    }

    fn addresses(changed: &[CellRange]) -> Vec<String> {
        changed.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn group_key_stops_at_first_blank() {
        let values = [v("12"), v("3.0"), CellValue::Empty, v("x")];
        assert_eq!(group_key(&values), "12-3");
        assert_eq!(group_key(&[CellValue::Empty, v("a")]), "");
    }

    #[test]
    fn group_key_number_forms_agree() {
        assert_eq!(group_key(&[CellValue::Number(5.0)]), group_key(&[CellValue::Number(5.0), CellValue::Empty]));
        assert_eq!(group_key(&[v("5")]), "5");
    }

    #[test]
    fn blank_rows_are_dropped() {
        let g = grid(&[["1", "1", "10", "2", ""], ["", "", "", "", ""], ["2", "1", "5", "1", ""]]);
        let records = extract_records(&g, &table(), 4).unwrap();
        assert_eq!(records.iter().map(|r| r.row).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(records[0].key, "1-1");
    }

    #[test]
    fn reordered_identical_rows_produce_no_changes() {
        let a = ["1", "1", "10", "2", "a"];
        let b = ["1", "2", "20", "3", "b"];
        let c = ["2", "1", "30", "4", "c"];
        let target = grid(&[a, b, c]);
        let reference = grid(&[c, a, b]);
        let (alignment, changed) = reconcile_records(&target, &reference, &table(), 4).unwrap();
        assert!(changed.is_empty());
        assert!(alignment.matched.iter().all(|m| m.distance == 0));
        assert!(alignment.inserted.is_empty());
        assert!(alignment.deleted.is_empty());
    }

    #[test]
    fn matched_rows_report_differing_check_columns() {
        let target = grid(&[["1", "1", "10", "2", "new note"]]);
        let reference = grid(&[["1", "1", "11", "2", "old note"]]);
        let (alignment, changed) = reconcile_records(&target, &reference, &table(), 2).unwrap();
        assert_eq!(alignment.matched[0].distance, 1);
        assert_eq!(addresses(&changed), vec!["C2", "E2"]);
    }

    #[test]
    fn inserted_key_flags_whole_check_span() {
        let target = grid(&[["1", "1", "10", "2", ""], ["9", "9", "1", "1", ""]]);
        let reference = grid(&[["1", "1", "10", "2", ""]]);
        let (alignment, changed) = reconcile_records(&target, &reference, &table(), 3).unwrap();
        assert_eq!(alignment.inserted, vec![3]);
        assert_eq!(addresses(&changed), vec!["A3:E3"]);
    }

    #[test]
    fn deleted_key_produces_nothing() {
        let target = grid(&[["1", "1", "10", "2", ""]]);
        let reference = grid(&[["1", "1", "10", "2", ""], ["7", "7", "1", "1", ""]]);
        let (alignment, changed) = reconcile_records(&target, &reference, &table(), 3).unwrap();
        assert!(changed.is_empty());
        assert_eq!(alignment.deleted, vec![3]);
    }

    #[test]
    fn mixed_forest_rows_pair_by_minimum_distance() {
        // Two rows share key 1-1; the reference lists them swapped and one
        // value changed. The closest pairing must win over row order.
        let target = grid(&[["1", "1", "10", "2", ""], ["1", "1", "50", "8", ""]]);
        let reference = grid(&[["1", "1", "50", "9", ""], ["1", "1", "10", "2", ""]]);
        let (alignment, changed) = reconcile_records(&target, &reference, &table(), 3).unwrap();
        assert_eq!(
            alignment.matched,
            vec![
                MatchedRecord { target_row: 2, reference_row: 3, distance: 0 },
                MatchedRecord { target_row: 3, reference_row: 2, distance: 1 },
            ]
        );
        assert_eq!(addresses(&changed), vec!["D3"]);
    }

    #[test]
    fn ties_go_to_lower_rows() {
        let target = grid(&[["1", "1", "10", "2", ""], ["1", "1", "10", "2", ""]]);
        let reference = grid(&[["1", "1", "10", "2", ""], ["1", "1", "10", "2", ""]]);
        let (alignment, _) = reconcile_records(&target, &reference, &table(), 3).unwrap();
        assert_eq!(alignment.matched[0].target_row, 2);
        assert_eq!(alignment.matched[0].reference_row, 2);
        assert_eq!(alignment.matched[1].target_row, 3);
        assert_eq!(alignment.matched[1].reference_row, 3);
    }

    #[test]
    fn surplus_target_rows_in_shared_group_are_inserted() {
        let target = grid(&[["1", "1", "10", "2", ""], ["1", "1", "99", "9", ""]]);
        let reference = grid(&[["1", "1", "10", "2", ""]]);
        let (alignment, changed) = reconcile_records(&target, &reference, &table(), 3).unwrap();
        assert_eq!(alignment.inserted, vec![3]);
        assert_eq!(addresses(&changed), vec!["A3:E3"]);
    }

    #[test]
    fn changes_are_emitted_group_by_group() {
        // Key 1-1 has a surplus row; key 2-1 has a changed volume. The 1-1
        // insertion comes before the 2-1 change even though matched pairs
        // and insertions are collected separately.
        let target = grid(&[
            ["1", "1", "10", "2", ""],
            ["2", "1", "31", "4", ""],
            ["1", "1", "99", "9", ""],
        ]);
        let reference = grid(&[["1", "1", "10", "2", ""], ["2", "1", "30", "4", ""]]);
        let (alignment, changed) = reconcile_records(&target, &reference, &table(), 4).unwrap();
        assert_eq!(alignment.inserted, vec![4]);
        assert_eq!(addresses(&changed), vec!["A4:E4", "C3"]);
    }

    #[test]
    fn reconciliation_is_deterministic() {
        let target = grid(&[
            ["1", "1", "10", "2", "x"],
            ["1", "1", "10", "3", "y"],
            ["2", "", "4", "4", ""],
            ["3", "1", "1", "1", ""],
        ]);
        let reference = grid(&[
            ["2", "", "4", "5", ""],
            ["1", "1", "10", "4", "y"],
            ["1", "1", "10", "2", "z"],
        ]);
        let first = reconcile_records(&target, &reference, &table(), 5).unwrap();
        let second = reconcile_records(&target, &reference, &table(), 5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn compare_column_outside_window_is_an_error() {
        let mut t = table();
        t.compare_columns.push(9);
        let g = grid(&[["1", "1", "10", "2", ""]]);
        let err = reconcile_records(&g, &g, &t, 2).unwrap_err();
        assert!(matches!(err, ReconError::ColumnOutsideWindow { ref column, row: 2, .. } if column == "I"));
    }
}
