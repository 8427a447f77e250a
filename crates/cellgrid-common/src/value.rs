//! The value a cell presents to readers.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{FormulaError, FormulaErrorKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a read of a cell yields: a number, a piece of text, or an
/// evaluation error. Empty and absent cells read as `Number(0.0)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CellValue::Number(n) => n.to_bits().hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Error(e) => e.hash(state),
        }
    }
}

// Stored numbers are always finite, so the reflexivity hole in f64's
// PartialEq cannot be observed here.
impl Eq for CellValue {}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Error(e) => write!(f, "{e}"),
        }
    }
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<FormulaError> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<FormulaError> for CellValue {
    fn from(e: FormulaError) -> Self {
        CellValue::Error(e)
    }
}

impl From<FormulaErrorKind> for CellValue {
    fn from(kind: FormulaErrorKind) -> Self {
        CellValue::Error(FormulaError::new(kind))
    }
}
