//! Error taxonomy of the evaluation core.
//!
//! Two families live here. [`SheetError`] covers the control-flow failures
//! that abort an operation before any state is touched. [`FormulaError`] is
//! not control flow at all: it is a *value* a formula cell can evaluate to,
//! printed as its token (`#REF!`, `#VALUE!`, `#ARITHM!`) and propagated
//! through further arithmetic like any other operand.

use std::error::Error;
use std::fmt;

use crate::position::Position;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kinds of error a formula can evaluate to.
///
/// Names are CamelCase (idiomatic Rust) while `Display` renders the tokens
/// exactly as the printable view shows them.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FormulaErrorKind {
    /// A referenced position lies outside the grid bounds.
    Ref,
    /// A referenced cell holds text that is not a number.
    Value,
    /// The computation produced a non-finite number.
    Arithmetic,
}

impl fmt::Display for FormulaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormulaErrorKind::Ref => "#REF!",
            FormulaErrorKind::Value => "#VALUE!",
            FormulaErrorKind::Arithmetic => "#ARITHM!",
        })
    }
}

/// An evaluation error carried as a cell value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FormulaError {
    kind: FormulaErrorKind,
}

impl FormulaError {
    pub const fn new(kind: FormulaErrorKind) -> Self {
        FormulaError { kind }
    }

    pub const fn kind(self) -> FormulaErrorKind {
        self.kind
    }
}

impl From<FormulaErrorKind> for FormulaError {
    fn from(kind: FormulaErrorKind) -> Self {
        FormulaError::new(kind)
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Error for FormulaError {}

impl PartialEq<str> for FormulaError {
    fn eq(&self, other: &str) -> bool {
        self.kind.to_string() == other
    }
}

impl PartialEq<&str> for FormulaError {
    fn eq(&self, other: &&str) -> bool {
        self.kind.to_string() == *other
    }
}

/// Failures that abort a sheet operation.
///
/// Every variant surfaces before any observable mutation: a rejected edit
/// leaves the grid, the dependency graph, and every memoized value exactly
/// as they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// The given position lies outside the grid bounds.
    InvalidPosition(Position),
    /// A `=`-prefixed body failed to parse.
    FormulaParse(String),
    /// The edit would create a path from the cell back to itself.
    CircularDependency(Position),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::InvalidPosition(pos) => {
                write!(f, "position ({}, {}) is out of bounds", pos.row, pos.col)
            }
            SheetError::FormulaParse(msg) => write!(f, "formula parse error: {msg}"),
            SheetError::CircularDependency(pos) => {
                write!(f, "edit at {pos} would introduce a circular dependency")
            }
        }
    }
}

impl Error for SheetError {}
