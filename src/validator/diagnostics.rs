//! Unified diagnostic taxonomy (§7): every stage's local error type converts
//! into this one shape before reaching a caller.

use crate::parser::ParseError;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One compiler-reported problem (§6, §7): `{filename, line, column, message,
/// severity}`. Formatting is always `filename:line:column: message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub filename: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(span: &Span, message: impl Into<String>) -> Self {
        Diagnostic {
            filename: span.file.to_string(),
            line: span.start.line,
            column: span.start.column,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(span: &Span, message: impl Into<String>) -> Self {
        Diagnostic {
            filename: span.file.to_string(),
            line: span.start.line,
            column: span.start.column,
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.filename, self.line, self.column, self.message
        )
    }
}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Self {
        let span = e.span().clone();
        let message = match &e {
            ParseError::UnexpectedToken { expected, found, .. } => {
                format!("expected {expected}, found {found}")
            }
            ParseError::UnexpectedEof { expected, .. } => {
                format!("expected {expected}, found end of file")
            }
            ParseError::Lex { message, .. } => message.clone(),
        };
        Diagnostic::error(&span, message)
    }
}
