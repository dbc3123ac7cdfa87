//! Cell value type.

use serde::Serialize;

/// A single spreadsheet cell value.
///
/// The variant set is closed on purpose: everything a workbook cell can
/// carry is folded into text, number, boolean or empty. Dates arrive as
/// their serial numbers, matching how both container formats store them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Text content.
    Text(String),
    /// Numeric content (integers included).
    Number(f64),
    /// Boolean content.
    Bool(bool),
    /// An absent or blank cell.
    Empty,
}

impl CellValue {
    /// Returns true for [`CellValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Render the value as a column label.
    ///
    /// Integral numbers render without a fractional part, so a header cell
    /// holding `2024.0` becomes the label `"2024"`.
    pub fn to_label(&self) -> String {
        match self {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                (*n as i64).to_string()
            }
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::Text(text)
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}
