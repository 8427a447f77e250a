//! Precedence-climbing parser producing the formula AST.

use std::error::Error;
use std::fmt::{self, Display};

use cellgrid_common::Position;

use crate::tokenizer::{Associativity, Token, TokenSubType, TokenType, Tokenizer, TokenizerError};

/// A custom error type for the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Option<usize>,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.position {
            write!(f, "ParseError at position {}: {}", pos, self.message)
        } else {
            write!(f, "ParseError: {}", self.message)
        }
    }
}

impl Error for ParseError {}

impl From<TokenizerError> for ParseError {
    fn from(err: TokenizerError) -> Self {
        ParseError {
            message: err.message,
            position: Some(err.pos),
        }
    }
}

/// Unary operators of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
}

impl UnaryOp {
    pub const fn symbol(self) -> char {
        match self {
            UnaryOp::Plus => '+',
            UnaryOp::Minus => '-',
        }
    }
}

/// Binary operators of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub const fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }
}

/// A parsed formula expression.
///
/// References keep whatever coordinates the source named, including ones
/// outside the grid bounds; an out-of-bounds reference renders back to its
/// original name and evaluates to `#REF!`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ref(Position),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
}

impl Expr {
    /// Binding strength used for both parsing sanity checks and the minimal
    /// parenthesization of the canonical rendering. Atoms bind tightest.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::Ref(_) => 4,
            Expr::Unary { .. } => 3,
            Expr::Binary { op, .. } => op.precedence(),
        }
    }

    pub(crate) fn collect_refs(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(pos) => out.push(*pos),
            Expr::Unary { operand, .. } => operand.collect_refs(out),
            Expr::Binary { left, right, .. } => {
                left.collect_refs(out);
                right.collect_refs(out);
            }
        }
    }
}

/// Parse a formula expression (the part after the `=` sign).
pub fn parse(expression: &str) -> Result<Expr, ParseError> {
    let tokens = Tokenizer::new(expression)?.into_tokens();
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError {
                message: "empty expression".to_string(),
                position: None,
            });
        }

        let expr = self.parse_expression()?;
        if self.position < self.tokens.len() {
            return Err(ParseError {
                message: format!("unexpected token {}", self.tokens[self.position]),
                position: Some(self.tokens[self.position].start),
            });
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_op(0)
    }

    fn parse_binary_op(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary_op()?;

        while self.position < self.tokens.len() {
            let token = &self.tokens[self.position];
            if token.token_type != TokenType::OpInfix {
                break;
            }

            let (precedence, associativity) =
                token.get_precedence().unwrap_or((0, Associativity::Left));
            if precedence < min_precedence {
                break;
            }

            let op = binary_op(token)?;
            self.position += 1;

            let next_min_precedence = if associativity == Associativity::Left {
                precedence + 1
            } else {
                precedence
            };

            let right = self.parse_binary_op(next_min_precedence)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_op(&mut self) -> Result<Expr, ParseError> {
        if self.position < self.tokens.len()
            && self.tokens[self.position].token_type == TokenType::OpPrefix
        {
            let op = unary_op(&self.tokens[self.position])?;
            self.position += 1;
            let operand = self.parse_unary_op()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.tokens.get(self.position) else {
            return Err(ParseError {
                message: "unexpected end of expression".to_string(),
                position: self.tokens.last().map(|t| t.end),
            });
        };

        match (token.token_type, token.subtype) {
            (TokenType::Operand, _) => {
                let token = self.tokens[self.position].clone();
                self.position += 1;
                self.parse_operand(&token)
            }
            (TokenType::Paren, TokenSubType::Open) => {
                self.position += 1;
                let expr = self.parse_expression()?;
                let closed = matches!(
                    self.tokens.get(self.position),
                    Some(t) if t.token_type == TokenType::Paren && t.subtype == TokenSubType::Close
                );
                if !closed {
                    return Err(ParseError {
                        message: "expected closing parenthesis".to_string(),
                        position: self.tokens.get(self.position).map(|t| t.start),
                    });
                }
                self.position += 1;
                Ok(expr)
            }
            _ => Err(ParseError {
                message: format!("unexpected token {token}"),
                position: Some(token.start),
            }),
        }
    }

    fn parse_operand(&mut self, token: &Token) -> Result<Expr, ParseError> {
        match token.subtype {
            TokenSubType::Number => {
                let value = token.value.parse::<f64>().map_err(|_| ParseError {
                    message: format!("invalid number '{}'", token.value),
                    position: Some(token.start),
                })?;
                Ok(Expr::Number(value))
            }
            TokenSubType::Reference => {
                let pos = Position::parse(&token.value).map_err(|err| ParseError {
                    message: format!("invalid reference '{}': {err}", token.value),
                    position: Some(token.start),
                })?;
                Ok(Expr::Ref(pos))
            }
            _ => Err(ParseError {
                message: format!("unexpected operand {token}"),
                position: Some(token.start),
            }),
        }
    }
}

fn binary_op(token: &Token) -> Result<BinaryOp, ParseError> {
    match token.value.as_str() {
        "+" => Ok(BinaryOp::Add),
        "-" => Ok(BinaryOp::Sub),
        "*" => Ok(BinaryOp::Mul),
        "/" => Ok(BinaryOp::Div),
        _ => Err(ParseError {
            message: format!("unknown operator '{}'", token.value),
            position: Some(token.start),
        }),
    }
}

fn unary_op(token: &Token) -> Result<UnaryOp, ParseError> {
    match token.value.as_str() {
        "+" => Ok(UnaryOp::Plus),
        "-" => Ok(UnaryOp::Minus),
        _ => Err(ParseError {
            message: format!("unknown prefix operator '{}'", token.value),
            position: Some(token.start),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn precedence_shapes() {
        assert_eq!(
            parse("1+2*3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                left: num(1.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn left_associativity() {
        // 1-2-3 parses as (1-2)-3
        assert_eq!(
            parse("1-2-3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    left: num(1.0),
                    right: num(2.0),
                }),
                right: num(3.0),
            }
        );
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        // -1+2 parses as (-1)+2
        assert_eq!(
            parse("-1+2").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Unary {
                    op: UnaryOp::Minus,
                    operand: num(1.0),
                }),
                right: num(2.0),
            }
        );
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(
            parse("(1+2)*3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Mul,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Add,
                    left: num(1.0),
                    right: num(2.0),
                }),
                right: num(3.0),
            }
        );
    }

    #[test]
    fn references_parse_including_out_of_bounds() {
        assert_eq!(
            parse("A1").unwrap(),
            Expr::Ref(Position::new(0, 0))
        );
        // Grammar-valid but outside the grid: kept, marked invalid.
        match parse("ZZZ1").unwrap() {
            Expr::Ref(pos) => assert!(!pos.is_valid()),
            other => panic!("expected reference, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("").is_err());
        assert!(parse("1+").is_err());
        assert!(parse("(1").is_err());
        assert!(parse("1)").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("*1").is_err());
        assert!(parse("AAAA1").is_err());
        assert!(parse("A0").is_err());
    }
}
