pub mod error;
pub mod position;
pub mod value;

pub use error::{FormulaError, FormulaErrorKind, SheetError};
pub use position::{Position, PositionParseError, Size, MAX_COLS, MAX_ROWS};
pub use value::CellValue;

/// Leading marker of a formula body (`"=A1+1"`).
pub const FORMULA_SIGN: char = '=';

/// Leading marker of a text body whose remainder is taken literally,
/// even when it would otherwise start a formula (`"'=A1"`).
pub const ESCAPE_SIGN: char = '\'';
