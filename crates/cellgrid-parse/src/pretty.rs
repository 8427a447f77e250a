//! Canonical rendering of parsed expressions.
//!
//! The canonical form is what a formula cell reports as its text: no
//! whitespace, and only the parentheses the structure requires. Rendering is
//! a fixpoint; parsing a canonical string and rendering it again yields the
//! same string.

use std::fmt::{self, Write};

use crate::parser::{BinaryOp, Expr};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Ref(pos) => write!(f, "{pos}"),
            Expr::Unary { op, operand } => {
                f.write_char(op.symbol())?;
                write_child(f, operand, self.precedence(), false)
            }
            Expr::Binary { op, left, right } => {
                write_child(f, left, op.precedence(), false)?;
                f.write_char(op.symbol())?;
                // Subtraction and division do not associate on the right:
                // 1-(2-3) must keep its parentheses.
                let strict = matches!(op, BinaryOp::Sub | BinaryOp::Div);
                write_child(f, right, op.precedence(), strict)
            }
        }
    }
}

fn write_child(
    f: &mut fmt::Formatter<'_>,
    child: &Expr,
    parent_precedence: u8,
    strict: bool,
) -> fmt::Result {
    let child_precedence = child.precedence();
    let parens =
        child_precedence < parent_precedence || (strict && child_precedence == parent_precedence);
    if parens {
        write!(f, "({child})")
    } else {
        write!(f, "{child}")
    }
}

/// Render the canonical, whitespace-free form of an expression.
pub fn canonical_expression(expr: &Expr) -> String {
    expr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn canonical(source: &str) -> String {
        canonical_expression(&parse(source).unwrap())
    }

    #[test]
    fn strips_whitespace() {
        assert_eq!(canonical("1 +  2"), "1+2");
        assert_eq!(canonical(" A1 * B2 "), "A1*B2");
    }

    #[test]
    fn drops_redundant_parentheses() {
        assert_eq!(canonical("(1+2)"), "1+2");
        assert_eq!(canonical("((1))*((2))"), "1*2");
        assert_eq!(canonical("(1*2)+3"), "1*2+3");
        assert_eq!(canonical("1+(2*3)"), "1+2*3");
        assert_eq!(canonical("(1-2)-3"), "1-2-3");
        assert_eq!(canonical("(1/2)/3"), "1/2/3");
    }

    #[test]
    fn keeps_required_parentheses() {
        assert_eq!(canonical("(1+2)*3"), "(1+2)*3");
        assert_eq!(canonical("1-(2-3)"), "1-(2-3)");
        assert_eq!(canonical("1/(2/3)"), "1/(2/3)");
        assert_eq!(canonical("2/(3+4)"), "2/(3+4)");
        assert_eq!(canonical("-(1+2)"), "-(1+2)");
    }

    #[test]
    fn unary_rendering() {
        assert_eq!(canonical("-1"), "-1");
        assert_eq!(canonical("+A1"), "+A1");
        assert_eq!(canonical("--1"), "--1");
        assert_eq!(canonical("-1*2"), "-1*2");
    }

    #[test]
    fn numbers_render_in_default_float_format() {
        assert_eq!(canonical("1.50"), "1.5");
        assert_eq!(canonical("2e2"), "200");
        assert_eq!(canonical("1."), "1");
    }

    #[test]
    fn rendering_is_a_fixpoint() {
        for source in ["1+2*3", "(1+2)*3", "1-(2-3)", "-(A1+B2)/C3", "--1"] {
            let once = canonical(source);
            assert_eq!(canonical(&once), once);
        }
    }
}
