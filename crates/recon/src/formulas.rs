//! Formula-column comparison for computed sheets.
//!
//! Computed sheets hold the same values whenever their inputs agree, so a
//! value diff would only echo changes already surfaced elsewhere. What
//! matters there is whether the formulas themselves were edited.

use plandiff_core::{Address, CellRange, Grid};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaColumns {
    pub columns: Vec<u32>,
    pub first_row: u32,
}

/// Addresses in the designated columns whose formula text differs.
/// Both grids come from `Document::read_formulas`.
pub fn compare_formula_columns(
    target: &Grid,
    reference: &Grid,
    plan: &FormulaColumns,
    last_row: u32,
) -> Vec<CellRange> {
    let mut changed = Vec::new();
    for &col in &plan.columns {
        for row in plan.first_row..=last_row {
            let a = Address { col, row };
            if target.cell(a) != reference.cell(a) {
                changed.push(CellRange::single(a));
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use plandiff_core::CellValue;

    #[test]
    fn reports_edited_formulas_only() {
        let target = Grid::new(
            Address { col: 1, row: 1 },
            vec![
                vec![CellValue::text("=B1*2"), CellValue::Number(4.0)],
                vec![CellValue::text("=B2*3"), CellValue::Number(5.0)],
                vec![CellValue::Number(7.0)],
            ],
        );
        let reference = Grid::new(
            Address { col: 1, row: 1 },
            vec![
                vec![CellValue::text("=B1*2"), CellValue::Number(9.0)],
                vec![CellValue::text("=B2*2"), CellValue::Number(5.0)],
                vec![CellValue::Number(7.0)],
            ],
        );
        let plan = FormulaColumns { columns: vec![1], first_row: 1 };
        let changed = compare_formula_columns(&target, &reference, &plan, 4);
        assert_eq!(changed, vec![CellRange::parse("A2").unwrap()]);
    }
}
