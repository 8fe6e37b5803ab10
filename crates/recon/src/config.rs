use std::collections::HashSet;

use plandiff_core::{column_to_number, Address, CellRange};
use serde::{Deserialize, Serialize};

use crate::blocks::BlockTable;
use crate::error::ReconError;
use crate::formulas::FormulaColumns;
use crate::records::RecordTable;

/// Profile for plan format 1.3.0, embedded at build time.
pub const BUILTIN_PROFILE: &str = include_str!("../profiles/plan-v1.3.0.toml");

// ---------------------------------------------------------------------------
// Raw TOML schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub name: String,
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(default)]
    pub sheets: Vec<SheetConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetConfig {
    pub name: String,
    /// Addresses or ranges flagged as a whole.
    #[serde(default)]
    pub check: Vec<String>,
    /// Ranges expanded to single cells, each flagged on its own.
    #[serde(default)]
    pub check_each: Vec<String>,
    #[serde(default)]
    pub copy: Vec<String>,
    /// Copy addresses written as literal text.
    #[serde(default)]
    pub text_coerce: Vec<String>,
    /// Cells whose flagged differences are colored word by word.
    #[serde(default)]
    pub text_cells: Vec<String>,
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,
    #[serde(default)]
    pub repeat: Vec<RepeatConfig>,
    #[serde(default)]
    pub records: Option<RecordsConfig>,
    #[serde(default)]
    pub blocks: Option<BlocksConfig>,
    #[serde(default)]
    pub formulas: Option<FormulasConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorConfig {
    pub compare: String,
    pub indicator: String,
}

/// A pattern repeated over a grid of offsets. Each axis takes either
/// `*_step` + `*_count` or an explicit `*_offsets` list.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepeatConfig {
    pub row_step: Option<u32>,
    pub row_count: Option<u32>,
    pub row_offsets: Option<Vec<i64>>,
    pub col_step: Option<u32>,
    pub col_count: Option<u32>,
    pub col_offsets: Option<Vec<i64>>,
    #[serde(default)]
    pub check: Vec<String>,
    #[serde(default)]
    pub check_each: Vec<String>,
    #[serde(default)]
    pub copy: Vec<String>,
    #[serde(default)]
    pub text_cells: Vec<String>,
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordsConfig {
    pub first_row: u32,
    /// Column letters or `"B:AE"` spans.
    pub check_columns: Vec<String>,
    pub key_columns: Vec<String>,
    pub compare_columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlocksConfig {
    pub label: String,
    pub interval: u32,
    pub data_start_row: u32,
    #[serde(default = "default_block_width")]
    pub width: u32,
}

fn default_block_width() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormulasConfig {
    pub columns: Vec<String>,
    pub first_row: u32,
}

// ---------------------------------------------------------------------------
// Resolved profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRule {
    pub compare: CellRange,
    pub indicator: CellRange,
}

/// Everything the engines need for one sheet, parsed and expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetPlan {
    pub name: String,
    pub check: Vec<CellRange>,
    pub copy: Vec<CellRange>,
    pub text_coerce: Vec<CellRange>,
    pub text_cells: Vec<Address>,
    pub indicators: Vec<IndicatorRule>,
    pub records: Option<RecordTable>,
    pub blocks: Option<BlockTable>,
    pub formulas: Option<FormulaColumns>,
}

impl SheetPlan {
    pub fn is_text_cell(&self, range: &CellRange) -> bool {
        range.is_single() && self.text_cells.contains(&range.top_left())
    }

    pub fn coerces_text(&self, range: &CellRange) -> bool {
        self.text_coerce.contains(range)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub format_version: Option<String>,
    pub sheets: Vec<SheetPlan>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Profile {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ProfileConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.resolve()
    }

    pub fn builtin() -> Result<Self, ReconError> {
        Self::from_toml(BUILTIN_PROFILE)
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetPlan> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

impl ProfileConfig {
    /// Validate every entry and expand repeats into a [`Profile`].
    pub fn resolve(&self) -> Result<Profile, ReconError> {
        let mut seen = HashSet::new();
        let mut sheets = Vec::with_capacity(self.sheets.len());

        for sheet in &self.sheets {
            if !seen.insert(sheet.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "sheet '{}' is listed more than once",
                    sheet.name
                )));
            }
            sheets.push(
                resolve_sheet(sheet)
                    .map_err(|msg| ReconError::ConfigValidation(format!("sheet '{}': {msg}", sheet.name)))?,
            );
        }

        Ok(Profile {
            name: self.name.clone(),
            format_version: self.format_version.clone(),
            sheets,
        })
    }
}

fn resolve_sheet(sheet: &SheetConfig) -> Result<SheetPlan, String> {
    let mut check = parse_ranges("check", &sheet.check)?;
    check.extend(expand_cells("check_each", &sheet.check_each)?);
    let mut copy = parse_ranges("copy", &sheet.copy)?;
    let text_coerce = parse_ranges("text_coerce", &sheet.text_coerce)?;
    let mut text_cells = expand_cells("text_cells", &sheet.text_cells)?;
    let mut indicators = parse_indicators(&sheet.indicators)?;

    for (i, repeat) in sheet.repeat.iter().enumerate() {
        let ctx = format!("repeat[{i}]");
        let rows = axis_offsets(&ctx, "row", repeat.row_step, repeat.row_count, &repeat.row_offsets)?;
        let cols = axis_offsets(&ctx, "col", repeat.col_step, repeat.col_count, &repeat.col_offsets)?;

        let pattern_check = parse_ranges(&format!("{ctx}.check"), &repeat.check)?;
        let pattern_each = expand_cells(&format!("{ctx}.check_each"), &repeat.check_each)?;
        let pattern_copy = parse_ranges(&format!("{ctx}.copy"), &repeat.copy)?;
        let pattern_text = expand_cells(&format!("{ctx}.text_cells"), &repeat.text_cells)?;
        let pattern_indicators = parse_indicators(&repeat.indicators)?;

        for &dr in &rows {
            for &dc in &cols {
                check.extend(pattern_check.iter().map(|r| r.translate(dc, dr)));
                check.extend(pattern_each.iter().map(|r| r.translate(dc, dr)));
                copy.extend(pattern_copy.iter().map(|r| r.translate(dc, dr)));
                text_cells.extend(pattern_text.iter().map(|r| r.translate(dc, dr)));
                indicators.extend(pattern_indicators.iter().map(|rule| IndicatorRule {
                    compare: rule.compare.translate(dc, dr),
                    indicator: rule.indicator.translate(dc, dr),
                }));
            }
        }
    }

    let records = sheet.records.as_ref().map(resolve_records).transpose()?;
    let blocks = sheet.blocks.as_ref().map(resolve_blocks).transpose()?;
    let formulas = sheet.formulas.as_ref().map(resolve_formulas).transpose()?;

    Ok(SheetPlan {
        name: sheet.name.clone(),
        check,
        copy,
        text_coerce,
        text_cells: text_cells.into_iter().map(|r| r.top_left()).collect(),
        indicators,
        records,
        blocks,
        formulas,
    })
}

fn parse_ranges(field: &str, items: &[String]) -> Result<Vec<CellRange>, String> {
    items
        .iter()
        .enumerate()
        .map(|(i, text)| CellRange::parse(text).map_err(|e| format!("{field}[{i}]: {e}")))
        .collect()
}

/// Parse ranges and expand each into its single cells.
fn expand_cells(field: &str, items: &[String]) -> Result<Vec<CellRange>, String> {
    Ok(parse_ranges(field, items)?
        .iter()
        .flat_map(|r| r.cells().map(CellRange::single).collect::<Vec<_>>())
        .collect())
}

fn parse_indicators(items: &[IndicatorConfig]) -> Result<Vec<IndicatorRule>, String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let compare = CellRange::parse(&item.compare)
                .map_err(|e| format!("indicators[{i}].compare: {e}"))?;
            let indicator = CellRange::parse(&item.indicator)
                .map_err(|e| format!("indicators[{i}].indicator: {e}"))?;
            if !indicator.is_single() {
                return Err(format!("indicators[{i}].indicator must be a single cell, got {indicator}"));
            }
            Ok(IndicatorRule { compare, indicator })
        })
        .collect()
}

fn axis_offsets(
    ctx: &str,
    axis: &str,
    step: Option<u32>,
    count: Option<u32>,
    explicit: &Option<Vec<i64>>,
) -> Result<Vec<i64>, String> {
    match (step, count, explicit) {
        (None, None, None) => Ok(vec![0]),
        (None, None, Some(list)) if !list.is_empty() => Ok(list.clone()),
        (None, None, Some(_)) => Err(format!("{ctx}: {axis}_offsets must not be empty")),
        (_, _, Some(_)) => Err(format!(
            "{ctx}: use either {axis}_offsets or {axis}_step/{axis}_count, not both"
        )),
        (Some(step), Some(count), None) => {
            if step == 0 || count == 0 {
                return Err(format!("{ctx}: {axis}_step and {axis}_count must be at least 1"));
            }
            Ok((0..count as i64).map(|i| i * step as i64).collect())
        }
        _ => Err(format!("{ctx}: {axis}_step and {axis}_count must be given together")),
    }
}

/// Expand `["B", "D:F"]` into `[2, 4, 5, 6]`.
pub fn parse_columns(field: &str, specs: &[String]) -> Result<Vec<u32>, String> {
    let mut columns = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        let err = |e: plandiff_core::AddressError| format!("{field}[{i}]: {e}");
        match spec.split_once(':') {
            Some((from, to)) => {
                let from = column_to_number(from.trim()).map_err(err)?;
                let to = column_to_number(to.trim()).map_err(err)?;
                if from > to {
                    return Err(format!("{field}[{i}]: span '{spec}' runs backwards"));
                }
                columns.extend(from..=to);
            }
            None => columns.push(column_to_number(spec.trim()).map_err(err)?),
        }
    }
    Ok(columns)
}

fn resolve_records(cfg: &RecordsConfig) -> Result<RecordTable, String> {
    if cfg.first_row == 0 {
        return Err("records.first_row must be at least 1".into());
    }
    let table = RecordTable {
        first_row: cfg.first_row,
        check_columns: parse_columns("records.check_columns", &cfg.check_columns)?,
        key_columns: parse_columns("records.key_columns", &cfg.key_columns)?,
        compare_columns: parse_columns("records.compare_columns", &cfg.compare_columns)?,
    };
    if table.check_columns.is_empty() {
        return Err("records.check_columns must not be empty".into());
    }
    let (first, last) = table.window();
    for (field, cols) in [("key_columns", &table.key_columns), ("compare_columns", &table.compare_columns)] {
        if let Some(col) = cols.iter().find(|c| !(first..=last).contains(*c)) {
            return Err(format!(
                "records.{field}: column {} lies outside the check window {}:{}",
                plandiff_core::number_to_column(*col),
                plandiff_core::number_to_column(first),
                plandiff_core::number_to_column(last),
            ));
        }
    }
    Ok(table)
}

fn resolve_blocks(cfg: &BlocksConfig) -> Result<BlockTable, String> {
    let label = Address::parse(&cfg.label).map_err(|e| format!("blocks.label: {e}"))?;
    if cfg.interval == 0 || cfg.width == 0 {
        return Err("blocks.interval and blocks.width must be at least 1".into());
    }
    if cfg.data_start_row <= label.row {
        return Err(format!(
            "blocks.data_start_row ({}) must lie below the label row ({})",
            cfg.data_start_row, label.row
        ));
    }
    Ok(BlockTable {
        label,
        interval: cfg.interval,
        data_start_row: cfg.data_start_row,
        width: cfg.width,
    })
}

fn resolve_formulas(cfg: &FormulasConfig) -> Result<FormulaColumns, String> {
    if cfg.first_row == 0 {
        return Err("formulas.first_row must be at least 1".into());
    }
    let columns = parse_columns("formulas.columns", &cfg.columns)?;
    if columns.is_empty() {
        return Err("formulas.columns must not be empty".into());
    }
    Ok(FormulaColumns { columns, first_row: cfg.first_row })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
