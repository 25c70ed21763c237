//! Parser error type and recovery (§4.2, §7).
//!
//! Modeled directly on the teacher's `ParserError` (phase-tagged `String`
//! variants with manual `Display`/`Error` impls) rather than a derive
//! macro, since each phase's message needs a different shape.

use crate::span::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },
    UnexpectedEof {
        span: Span,
        expected: String,
    },
    Lex {
        span: Span,
        message: String,
    },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => span,
            ParseError::UnexpectedEof { span, .. } => span,
            ParseError::Lex { span, .. } => span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                span,
                expected,
                found,
            } => write!(f, "{span}: expected {expected}, found {found}"),
            ParseError::UnexpectedEof { span, expected } => {
                write!(f, "{span}: expected {expected}, found end of file")
            }
            ParseError::Lex { span, message } => write!(f, "{span}: {message}"),
        }
    }
}

impl std::error::Error for ParseError {}
