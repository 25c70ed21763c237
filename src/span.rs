//! Source locations shared by every stage of the pipeline.
//!
//! A `Span` is attached to every token and AST node and survives every
//! transform unchanged, so a diagnostic raised in the validator can always
//! be traced back to the exact source text that produced it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// A single point in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Position {
    pub const fn start() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

/// A half-open `[start, end)` range within one file.
///
/// `file` is reference-counted rather than owned per span: a file with
/// thousands of tokens would otherwise duplicate its path string that many
/// times over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub file: Rc<str>,
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(file: Rc<str>, start: Position, end: Position) -> Self {
        Span { file, start, end }
    }

    /// A zero-width span, used for synthesized nodes (e.g. monomorphized
    /// copies) that have no literal source text of their own.
    pub fn synthetic(file: Rc<str>) -> Self {
        Span {
            file,
            start: Position::start(),
            end: Position::start(),
        }
    }

    pub fn merge(&self, other: &Span) -> Span {
        debug_assert_eq!(self.file, other.file, "merging spans from different files");
        Span {
            file: self.file.clone(),
            start: self.start,
            end: other.end,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start.line, self.start.column)
    }
}
