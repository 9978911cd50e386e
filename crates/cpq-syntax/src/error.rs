//! Error types for the parser and the code generator.
//!
//! Both compilation phases accumulate their errors into lists instead of
//! aborting on the first one, so a single run can surface as many
//! problems as possible. Parse errors carry the offending lexeme, the
//! set of terminals that would have been accepted, and the source
//! position; they are reported at most once per position. Code
//! generation errors are plain messages.
//!
//! # Examples
//!
//! ```rust
//! use cpq_syntax::error::ParseError;
//! use cpq_syntax::token::Position;
//!
//! let err = ParseError::new("kk", &["int", "float"], Position { line: 0, column: 7 });
//! assert_eq!(err.to_string(), "expected 'int' or 'float', found 'kk' at 0:7");
//! ```

use std::fmt;

use crate::token::Position;

/// A syntax error: an expected terminal was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Lexeme of the token that was actually found; empty at end of input.
    pub found: String,
    /// Human-readable names of the terminals that would have matched.
    pub expected: Vec<String>,
    /// Position of the found token. Also the deduplication key: the
    /// parser never reports two errors at the same position.
    pub position: Position,
}

impl ParseError {
    pub fn new(found: impl Into<String>, expected: &[&str], position: Position) -> Self {
        Self {
            found: found.into(),
            expected: expected.iter().map(|s| (*s).to_owned()).collect(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected ")?;
        for (i, expected) in self.expected.iter().enumerate() {
            if i > 0 {
                write!(f, " or ")?;
            }
            write!(f, "'{expected}'")?;
        }
        if self.found.is_empty() {
            write!(f, ", found end of input at {}", self.position)
        } else {
            write!(f, ", found '{}' at {}", self.found, self.position)
        }
    }
}

impl std::error::Error for ParseError {}

/// A semantic error found while generating code: duplicate declarations,
/// undefined variables, assignment type mismatches, `break` outside any
/// loop or switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenError {
    pub message: String,
}

impl CodegenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CodegenError {}
