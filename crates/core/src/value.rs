use serde::Serialize;

/// A cell value as read from a document.
///
/// `Empty` is the single blank sentinel: every unset cell reads as `Empty`
/// and two blanks compare equal. `Text("")` is a distinct value. There is
/// no coercion across variants, so `Number(1.0) != Text("1")`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way a user would type it: integral numbers
    /// without a fractional part, everything else via `Display` for f64.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
        }
    }

    /// Force the value to literal text. Blanks stay blank.
    pub fn coerce_text(&self) -> CellValue {
        match self {
            CellValue::Empty => CellValue::Empty,
            other => CellValue::Text(other.display_text()),
        }
    }

    /// Fragment contributed to a record group key. Numbers are truncated
    /// toward zero so `5.0`, `5` and `5.7` all contribute `"5"`.
    /// Blanks contribute nothing.
    pub fn key_fragment(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format!("{}", n.trunc() as i64)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}
