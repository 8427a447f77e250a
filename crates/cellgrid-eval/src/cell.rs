//! A single grid slot: its body and its incoming dependency edges.
//!
//! The body is a tagged variant: empty, literal text, or a formula with a
//! memoized result. The dependents set records which cells reference this
//! one; it belongs to the slot rather than the body so that clearing a cell
//! never loses the edges other formulas rely on.

use cellgrid_common::{
    CellValue, FormulaError, FormulaErrorKind, Position, ESCAPE_SIGN, FORMULA_SIGN,
};
use cellgrid_parse::{Formula, ParseError};
use rustc_hash::FxHashSet;

use crate::sheet::Sheet;

/// The three states a cell can be in.
#[derive(Debug, Clone)]
pub enum CellBody {
    Empty,
    /// A non-empty literal string, stored exactly as entered.
    Text(String),
    Formula(FormulaBody),
}

impl CellBody {
    /// Build a body from raw input text.
    ///
    /// Empty input is an empty body; input starting with the formula sign
    /// (and longer than just the sign) parses as a formula; everything else,
    /// including a lone `=`, is literal text.
    pub(crate) fn from_input(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() {
            return Ok(CellBody::Empty);
        }
        if let Some(expression) = text.strip_prefix(FORMULA_SIGN) {
            if !expression.is_empty() {
                let formula = Formula::parse(expression)?;
                return Ok(CellBody::Formula(FormulaBody::new(formula)));
            }
        }
        Ok(CellBody::Text(text.to_string()))
    }

    /// The raw stored form: `""`, the literal text, or `=` plus the
    /// canonical expression.
    pub fn text(&self) -> String {
        match self {
            CellBody::Empty => String::new(),
            CellBody::Text(s) => s.clone(),
            CellBody::Formula(body) => format!("{FORMULA_SIGN}{}", body.formula.expression()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellBody::Empty)
    }

    fn references(&self) -> &[Position] {
        match self {
            CellBody::Empty | CellBody::Text(_) => &[],
            CellBody::Formula(body) => body.formula.referenced_cells(),
        }
    }
}

/// A formula body: the parsed expression plus its memoized result.
///
/// Only finite numbers are memoized. Errors and non-finite results are
/// recomputed on every read, which keeps the memo a plain `Option<f64>`.
#[derive(Debug, Clone)]
pub struct FormulaBody {
    formula: Formula,
    cache: std::cell::Cell<Option<f64>>,
}

impl FormulaBody {
    fn new(formula: Formula) -> Self {
        FormulaBody {
            formula,
            cache: std::cell::Cell::new(None),
        }
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn is_cached(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Drop the memo. Returns whether one was present, so invalidation
    /// walks can stop where nothing was cached.
    fn invalidate(&self) -> bool {
        self.cache.take().is_some()
    }

    fn value(&self, sheet: &Sheet) -> CellValue {
        if let Some(cached) = self.cache.get() {
            return CellValue::Number(cached);
        }
        sheet.note_eval();
        match self
            .formula
            .evaluate(&|pos: Position| sheet.lookup_number(pos))
        {
            Ok(n) if n.is_finite() => {
                self.cache.set(Some(n));
                CellValue::Number(n)
            }
            Ok(_) => CellValue::Error(FormulaError::new(FormulaErrorKind::Arithmetic)),
            Err(err) => CellValue::Error(err),
        }
    }
}

/// A grid slot: one body plus the set of cells whose formulas read it.
#[derive(Debug, Clone)]
pub struct Cell {
    body: CellBody,
    dependents: FxHashSet<Position>,
}

impl Cell {
    pub(crate) fn new(body: CellBody) -> Self {
        Cell {
            body,
            dependents: FxHashSet::default(),
        }
    }

    /// An empty slot created only so dependent edges can be recorded.
    pub(crate) fn placeholder() -> Self {
        Cell::new(CellBody::Empty)
    }

    pub fn body(&self) -> &CellBody {
        &self.body
    }

    /// The raw stored form of the body.
    pub fn text(&self) -> String {
        self.body.text()
    }

    /// The value this cell presents: `0.0` for empty bodies, the unescaped
    /// string for text, and the (memoized) evaluation result for formulas.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        match &self.body {
            CellBody::Empty => CellValue::Number(0.0),
            CellBody::Text(raw) => {
                let shown = raw.strip_prefix(ESCAPE_SIGN).unwrap_or(raw);
                CellValue::Text(shown.to_string())
            }
            CellBody::Formula(body) => body.value(sheet),
        }
    }

    /// The cells this body references, sorted and deduplicated.
    pub fn referenced_cells(&self) -> &[Position] {
        self.body.references()
    }

    /// Snapshot of the cells referencing this one, in row-major order.
    pub fn dependent_cells(&self) -> Vec<Position> {
        let mut deps: Vec<Position> = self.dependents.iter().copied().collect();
        deps.sort_unstable();
        deps
    }

    pub(crate) fn set_body(&mut self, body: CellBody) {
        self.body = body;
    }

    pub(crate) fn add_dependent(&mut self, pos: Position) {
        self.dependents.insert(pos);
    }

    pub(crate) fn remove_dependent(&mut self, pos: Position) {
        self.dependents.remove(&pos);
    }

    pub(crate) fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }

    /// Drop this cell's memo if it has one; `true` when something was
    /// actually dropped.
    pub(crate) fn invalidate_cache(&self) -> bool {
        match &self.body {
            CellBody::Formula(body) => body.invalidate(),
            _ => false,
        }
    }

    /// Whether a formula body currently holds a memoized value. Text and
    /// empty bodies never do.
    pub fn is_cached(&self) -> bool {
        match &self.body {
            CellBody::Formula(body) => body.is_cached(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_an_empty_body() {
        let body = CellBody::from_input("").unwrap();
        assert!(body.is_empty());
        assert_eq!(body.text(), "");
    }

    #[test]
    fn plain_text_round_trips() {
        let body = CellBody::from_input("hello").unwrap();
        assert_eq!(body.text(), "hello");
        assert!(body.references().is_empty());
    }

    #[test]
    fn lone_equals_is_text() {
        let body = CellBody::from_input("=").unwrap();
        assert!(matches!(body, CellBody::Text(_)));
        assert_eq!(body.text(), "=");
    }

    #[test]
    fn escaped_text_keeps_its_raw_form() {
        let body = CellBody::from_input("'=A1").unwrap();
        assert_eq!(body.text(), "'=A1");
    }

    #[test]
    fn formula_text_is_canonical() {
        let body = CellBody::from_input("=1 +  2").unwrap();
        assert_eq!(body.text(), "=1+2");
    }

    #[test]
    fn formula_references_surface() {
        let body = CellBody::from_input("=B1+A1+B1").unwrap();
        assert_eq!(
            body.references(),
            &[Position::new(0, 0), Position::new(0, 1)]
        );
    }

    #[test]
    fn formula_parse_failure_propagates() {
        assert!(CellBody::from_input("=1+").is_err());
        assert!(CellBody::from_input("=(1").is_err());
    }
}
