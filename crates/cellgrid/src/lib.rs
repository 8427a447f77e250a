//! Meta crate that re-exports the cellgrid building blocks: addressing and
//! value types from `cellgrid-common`, the formula collaborator from
//! `cellgrid-parse`, and the sheet engine from `cellgrid-eval`. Depend on
//! this crate for the public surface; reach into the member crates when
//! deeper integration is required.

pub use cellgrid_common::{
    CellValue, FormulaError, FormulaErrorKind, Position, PositionParseError, SheetError, Size,
    ESCAPE_SIGN, FORMULA_SIGN, MAX_COLS, MAX_ROWS,
};
pub use cellgrid_eval::{Cell, CellBody, Sheet, SheetConfig};
pub use cellgrid_parse::{canonical_expression, CellResolver, Formula, ParseError};

/// Create a fresh, empty sheet.
pub fn create_sheet() -> Sheet {
    Sheet::new()
}

pub mod doc_examples {
    use crate::{CellValue, Position, Sheet, SheetError};

    /// Evaluate a single cell body in a throwaway sheet and return what it
    /// reads as.
    ///
    /// This helper is intended for documentation examples to avoid
    /// repetitive setup.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use cellgrid::doc_examples::eval_scalar;
    /// let value = eval_scalar("=(1+2)*3")?;
    /// assert_eq!(value, cellgrid::CellValue::Number(9.0));
    /// # Ok::<(), cellgrid::SheetError>(())
    /// ```
    pub fn eval_scalar(text: &str) -> Result<CellValue, SheetError> {
        let mut sheet = Sheet::new();
        let origin = Position::new(0, 0);
        sheet.set_cell(origin, text)?;
        sheet.cell_value(origin)
    }
}
