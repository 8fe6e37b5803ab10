//! Column-block reconciliation.
//!
//! Growth tables repeat a fixed-width block of columns, one block per
//! species/site rank, each headed by a label cell. Blocks are paired by
//! label equality, never by position or distance. A label is looked up by
//! its first occurrence on both sides, so when two blocks share a label
//! both resolve to the first target block and the first reference block.

use plandiff_core::{Address, CellRange, CellValue, Grid};
use serde::Serialize;

use crate::model::{BlockAlignment, MatchedBlock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockTable {
    /// Label cell of the first block.
    pub label: Address,
    /// Columns from one block's label to the next.
    pub interval: u32,
    /// First data row beneath the labels.
    pub data_start_row: u32,
    /// Data columns compared per block, starting at the label column.
    pub width: u32,
}

/// Non-blank labels from the label row, every `interval` columns up to
/// `last_col`, as `(column, label)`.
pub fn read_labels(grid: &Grid, table: &BlockTable, last_col: u32) -> Vec<(u32, CellValue)> {
    let row = table.label.row;
    (table.label.col..=last_col)
        .step_by(table.interval.max(1) as usize)
        .filter_map(|col| {
            let label = grid.cell(Address { col, row });
            (!label.is_blank()).then(|| (col, label.clone()))
        })
        .collect()
}

fn first_column(labels: &[(u32, CellValue)], label: &CellValue) -> Option<u32> {
    labels.iter().find(|(_, l)| l == label).map(|(col, _)| *col)
}

/// One entry per target block. Introduced columns are listed once.
pub fn align_blocks(target: &[(u32, CellValue)], reference: &[(u32, CellValue)]) -> BlockAlignment {
    let mut alignment = BlockAlignment::default();
    for (col, label) in target {
        let target_col = first_column(target, label).unwrap_or(*col);
        match first_column(reference, label) {
            Some(reference_col) => alignment.matched.push(MatchedBlock {
                target_col,
                reference_col,
                label: label.clone(),
            }),
            None => {
                tracing::debug!(column = col, label = ?label, "block label has no counterpart");
                if !alignment.introduced.contains(&target_col) {
                    alignment.introduced.push(target_col);
                }
            }
        }
    }
    alignment
}

/// Compare matched blocks cell by cell over `data_start_row..=last_row`;
/// introduced blocks report their label cell and every data cell.
pub fn changed_addresses(
    target: &Grid,
    reference: &Grid,
    alignment: &BlockAlignment,
    table: &BlockTable,
    last_row: u32,
) -> Vec<CellRange> {
    let mut changed = Vec::new();
    let mut compared: Vec<(u32, u32)> = Vec::new();

    for block in &alignment.matched {
        if compared.contains(&(block.target_col, block.reference_col)) {
            continue;
        }
        compared.push((block.target_col, block.reference_col));
        for offset in 0..table.width {
            for row in table.data_start_row..=last_row {
                let t = Address { col: block.target_col + offset, row };
                let r = Address { col: block.reference_col + offset, row };
                if target.cell(t) != reference.cell(r) {
                    changed.push(CellRange::single(t));
                }
            }
        }
    }

    for &col in &alignment.introduced {
        changed.push(CellRange::single(Address { col, row: table.label.row }));
        for offset in 0..table.width {
            for row in table.data_start_row..=last_row {
                changed.push(CellRange::single(Address { col: col + offset, row }));
            }
        }
    }

    changed
}

/// Full pipeline for one sheet's block table. `bottom_right` is the lower
/// right corner of the union of both documents' used ranges.
pub fn reconcile_blocks(
    target: &Grid,
    reference: &Grid,
    table: &BlockTable,
    bottom_right: Address,
) -> (BlockAlignment, Vec<CellRange>) {
    let target_labels = read_labels(target, table, bottom_right.col);
    let reference_labels = read_labels(reference, table, bottom_right.col);
    let alignment = align_blocks(&target_labels, &reference_labels);
    let changed = changed_addresses(target, reference, &alignment, table, bottom_right.row);
    (alignment, changed)
}
