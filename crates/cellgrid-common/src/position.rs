//! Grid addressing primitives shared across the parser and the sheet.
//!
//! A [`Position`] is a zero-based (row, column) pair. The printable form is
//! the familiar A1 notation: a base-26 letter run for the column and a
//! 1-based row number, e.g. `AB12`. Parsing accepts the full grammar
//! (`[A-Z]{1,3}[1-9][0-9]{0,4}`); a string that is grammatically well formed
//! but lands outside the grid bounds parses to a position for which
//! [`Position::is_valid`] returns `false`.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Exclusive row bound of the grid.
pub const MAX_ROWS: u32 = 16_384;
/// Exclusive column bound of the grid.
pub const MAX_COLS: u32 = 16_384;

const MAX_COL_LETTERS: usize = 3;
const MAX_ROW_DIGITS: usize = 5;

// Column lookup table for common columns (A-ZZ = 702 columns)
static COLUMN_LOOKUP: Lazy<Vec<String>> = Lazy::new(|| {
    let mut cols = Vec::with_capacity(702);
    for c in b'A'..=b'Z' {
        cols.push(String::from(c as char));
    }
    for c1 in b'A'..=b'Z' {
        for c2 in b'A'..=b'Z' {
            cols.push(format!("{}{}", c1 as char, c2 as char));
        }
    }
    cols
});

/// Errors returned when a position string does not match the A1 grammar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PositionParseError {
    Empty,
    /// No leading `A-Z` run.
    MissingColumn,
    /// No digit run after the column letters.
    MissingRow,
    /// More than three column letters.
    ColumnTooLong,
    /// More than five row digits.
    RowTooLong,
    /// Row numbers are 1-based and must not start with `0`.
    LeadingZero,
    /// Input continues past the row digits.
    UnexpectedChar(char),
}

impl fmt::Display for PositionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionParseError::Empty => write!(f, "empty position string"),
            PositionParseError::MissingColumn => write!(f, "expected column letters A-Z"),
            PositionParseError::MissingRow => write!(f, "expected a 1-based row number"),
            PositionParseError::ColumnTooLong => {
                write!(f, "column name longer than {MAX_COL_LETTERS} letters")
            }
            PositionParseError::RowTooLong => {
                write!(f, "row number longer than {MAX_ROW_DIGITS} digits")
            }
            PositionParseError::LeadingZero => write!(f, "row numbers start at 1"),
            PositionParseError::UnexpectedChar(c) => {
                write!(f, "unexpected character {c:?} after position")
            }
        }
    }
}

impl std::error::Error for PositionParseError {}

/// Zero-based cell coordinate with structural equality, hashing, and
/// row-major ordering.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl Position {
    pub const fn new(row: u32, col: u32) -> Self {
        Position { row, col }
    }

    /// Whether the coordinate lies inside the grid bounds.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Parse an A1-style name.
    ///
    /// Grammar violations are errors; an in-grammar name whose coordinates
    /// overflow the bounds yields `Ok` of an invalid position, so callers can
    /// distinguish "not a cell name" from "a cell name the grid cannot hold".
    pub fn parse(s: &str) -> Result<Self, PositionParseError> {
        let bytes = s.as_bytes();
        if bytes.is_empty() {
            return Err(PositionParseError::Empty);
        }

        let letters = bytes.iter().take_while(|b| b.is_ascii_uppercase()).count();
        if letters == 0 {
            return Err(PositionParseError::MissingColumn);
        }
        if letters > MAX_COL_LETTERS {
            return Err(PositionParseError::ColumnTooLong);
        }

        let digits = bytes[letters..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return Err(PositionParseError::MissingRow);
        }
        if digits > MAX_ROW_DIGITS {
            return Err(PositionParseError::RowTooLong);
        }
        if bytes[letters] == b'0' {
            return Err(PositionParseError::LeadingZero);
        }
        if letters + digits != bytes.len() {
            let rest = &s[letters + digits..];
            let c = rest.chars().next().unwrap_or('\0');
            return Err(PositionParseError::UnexpectedChar(c));
        }

        let col = letters_to_column_index(&bytes[..letters]);
        let row: u32 = bytes[letters..]
            .iter()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));

        Ok(Position::new(row - 1, col))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&column_to_letters(self.col))?;
        write!(f, "{}", self.row + 1)
    }
}

impl FromStr for Position {
    type Err = PositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::parse(s)
    }
}

impl From<(u32, u32)> for Position {
    fn from((row, col): (u32, u32)) -> Self {
        Position::new(row, col)
    }
}

/// Dimensions of the printable rectangle, anchored at the origin.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Size {
    pub rows: u32,
    pub cols: u32,
}

impl Size {
    pub const fn new(rows: u32, cols: u32) -> Self {
        Size { rows, cols }
    }
}

/// Render a zero-based column index as its letter name.
pub fn column_to_letters(col: u32) -> String {
    if let Some(name) = COLUMN_LOOKUP.get(col as usize) {
        return name.clone();
    }
    let mut col = col;
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(b'A' + rem);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

// Caller guarantees an uppercase run; the shifted base-26 digits cannot
// overflow u32 within three letters.
fn letters_to_column_index(letters: &[u8]) -> u32 {
    let mut col: u32 = 0;
    for (idx, b) in letters.iter().enumerate() {
        col = col * 26 + u32::from(b - b'A');
        if idx != letters.len() - 1 {
            col += 1;
        }
    }
    col
}
