//! Cellgrid evaluation engine.
//!
//! Owns the sparse cell grid and its dependency graph, rejects edits that
//! would make the graph cyclic, evaluates formulas lazily with memoized
//! results, and invalidates those results transitively when an upstream
//! cell changes.

pub mod cell;
pub mod sheet;

pub use cell::{Cell, CellBody};
pub use sheet::{Sheet, SheetConfig};

pub use cellgrid_common::{
    CellValue, FormulaError, FormulaErrorKind, Position, SheetError, Size,
};
