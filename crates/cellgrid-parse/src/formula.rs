//! The formula collaborator consumed by the sheet.
//!
//! A [`Formula`] owns a parsed expression and answers three questions: what
//! cells does it read (`referenced_cells`), what is its canonical text
//! (`expression`), and what does it compute given a way to read those cells
//! (`evaluate`). The lookup seam is the [`CellResolver`] trait, blanket
//! implemented for closures so callers can pass `|pos| ...` directly.

use cellgrid_common::{FormulaError, FormulaErrorKind, Position};

use crate::parser::{self, BinaryOp, Expr, ParseError, UnaryOp};
use crate::pretty;

/// Resolves a referenced cell to a number during evaluation.
///
/// Implementations may fail with a [`FormulaError`], which propagates
/// through the surrounding arithmetic unchanged.
pub trait CellResolver {
    fn resolve(&self, pos: Position) -> Result<f64, FormulaError>;
}

impl<F> CellResolver for F
where
    F: Fn(Position) -> Result<f64, FormulaError>,
{
    fn resolve(&self, pos: Position) -> Result<f64, FormulaError> {
        self(pos)
    }
}

/// A parsed, evaluable formula expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
    referenced: Vec<Position>,
}

impl Formula {
    /// Parse the expression part of a formula (everything after the `=`).
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        let expr = parser::parse(expression)?;

        let mut referenced = Vec::new();
        expr.collect_refs(&mut referenced);
        referenced.retain(|pos| pos.is_valid());
        referenced.sort_unstable();
        referenced.dedup();

        Ok(Formula { expr, referenced })
    }

    /// Evaluate against the given cell resolver.
    ///
    /// The result may be non-finite (e.g. after a division by zero); mapping
    /// non-finite results to `#ARITHM!` is the caller's policy, so that the
    /// decision sits next to the memoization it guards.
    pub fn evaluate<R: CellResolver>(&self, resolver: &R) -> Result<f64, FormulaError> {
        eval(&self.expr, resolver)
    }

    /// Canonical expression text: no whitespace, minimal parentheses.
    pub fn expression(&self) -> String {
        pretty::canonical_expression(&self.expr)
    }

    /// The valid cells the expression mentions, sorted and deduplicated.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.referenced
    }
}

fn eval<R: CellResolver>(expr: &Expr, resolver: &R) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Ref(pos) => {
            if !pos.is_valid() {
                return Err(FormulaError::new(FormulaErrorKind::Ref));
            }
            resolver.resolve(*pos)
        }
        Expr::Unary { op, operand } => {
            let v = eval(operand, resolver)?;
            Ok(match op {
                UnaryOp::Plus => v,
                UnaryOp::Minus => -v,
            })
        }
        Expr::Binary { op, left, right } => {
            let l = eval(left, resolver)?;
            let r = eval(right, resolver)?;
            Ok(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64) -> impl Fn(Position) -> Result<f64, FormulaError> {
        move |_| Ok(value)
    }

    #[test]
    fn evaluates_literals() {
        let f = Formula::parse("1+2*3").unwrap();
        assert_eq!(f.evaluate(&constant(0.0)), Ok(7.0));
    }

    #[test]
    fn evaluates_references_through_the_resolver() {
        let f = Formula::parse("A1*2+B1").unwrap();
        let resolver = |pos: Position| -> Result<f64, FormulaError> {
            if pos == Position::new(0, 0) {
                Ok(3.0)
            } else {
                Ok(10.0)
            }
        };
        assert_eq!(f.evaluate(&resolver), Ok(16.0));
    }

    #[test]
    fn resolver_errors_propagate() {
        let f = Formula::parse("1+A1").unwrap();
        let resolver = |_: Position| -> Result<f64, FormulaError> {
            Err(FormulaError::new(FormulaErrorKind::Value))
        };
        assert_eq!(
            f.evaluate(&resolver),
            Err(FormulaError::new(FormulaErrorKind::Value))
        );
    }

    #[test]
    fn out_of_bounds_reference_is_a_ref_error() {
        let f = Formula::parse("ZZZ1+1").unwrap();
        assert_eq!(
            f.evaluate(&constant(0.0)),
            Err(FormulaError::new(FormulaErrorKind::Ref))
        );
        // and it is not reported as a dependency
        assert!(f.referenced_cells().is_empty());
    }

    #[test]
    fn division_by_zero_is_non_finite_not_an_error() {
        let f = Formula::parse("1/0").unwrap();
        let result = f.evaluate(&constant(0.0)).unwrap();
        assert!(result.is_infinite());
    }

    #[test]
    fn referenced_cells_are_sorted_and_deduplicated() {
        let f = Formula::parse("B2+A1+B2+A10").unwrap();
        assert_eq!(
            f.referenced_cells(),
            &[
                Position::new(0, 0),  // A1
                Position::new(1, 1),  // B2
                Position::new(9, 0),  // A10
            ]
        );
    }

    #[test]
    fn canonical_expression_text() {
        let f = Formula::parse("( A1 +  2 ) * 3").unwrap();
        assert_eq!(f.expression(), "(A1+2)*3");
    }
}
