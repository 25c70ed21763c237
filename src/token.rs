//! Lexical atoms produced by the lexer and consumed by the parser.
//!
//! Trivia (comments, blank-line counts) is attached to the *following*
//! significant token rather than modeled as its own token kind — see
//! `Trivia` below and §4.1/§9 ("Trivia as statements") of the design notes.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyword {
    Class,
    Interface,
    Extends,
    Enum,
    Extern,
    Function,
    Let,
    Const,
    Readonly,
    Static,
    Private,
    Public,
    New,
    This,
    Return,
    If,
    Else,
    For,
    Of,
    While,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Import,
    From,
    Async,
    Await,
    Is,
    Null,
    True,
    False,
    Weak,
    Type,
    As,
    Void,
    Int,
    Float,
    Double,
    Char,
    Bool,
    StringType,
}

impl Keyword {
    pub fn lookup(ident: &str) -> Option<Keyword> {
        use Keyword::*;
        Some(match ident {
            "class" => Class,
            "interface" => Interface,
            "extends" => Extends,
            "enum" => Enum,
            "extern" => Extern,
            "function" => Function,
            "let" => Let,
            "const" => Const,
            "readonly" => Readonly,
            "static" => Static,
            "private" => Private,
            "public" => Public,
            "new" => New,
            "this" => This,
            "return" => Return,
            "if" => If,
            "else" => Else,
            "for" => For,
            "of" => Of,
            "while" => While,
            "switch" => Switch,
            "case" => Case,
            "default" => Default,
            "break" => Break,
            "continue" => Continue,
            "import" => Import,
            "from" => From,
            "async" => Async,
            "await" => Await,
            "is" => Is,
            "null" => Null,
            "true" => True,
            "false" => False,
            "weak" => Weak,
            "type" => Type,
            "as" => As,
            "void" => Void,
            "int" => Int,
            "float" => Float,
            "double" => Double,
            "char" => Char,
            "bool" => Bool,
            "string" => StringType,
            _ => return None,
        })
    }
}

/// Kinds of template-string chunks. A template string tokenizes into an
/// alternating sequence of `TemplateText` and interpolated expression
/// tokens delimited by `TemplateInterpolationStart`/`End` — see §4.1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    IntLiteral(i64),
    FloatLiteral(String), // kept as text; validator decides float vs double
    CharLiteral(char),
    StringLiteral(String),
    TemplateText(String),
    TemplateInterpolationStart,
    TemplateInterpolationEnd,
    /// `tag` immediately (no whitespace) adjacent to a template/string open
    /// quote — the lexer, not the parser, must observe adjacency (§9).
    TaggedTemplateTag(String),

    Identifier(String),
    Keyword(Keyword),

    // Punctuation / operators
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Question,
    QuestionQuestion,
    Arrow, // =>
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    DotDot,   // inclusive range
    DotDotLt, // exclusive range
    At,       // enum shorthand prefix consumed as part of `.Member` by parser context
    Pipe,     // union-type separator, `A | B`

    Eof,
    /// Malformed token (unterminated string/comment, bad escape); carries a
    /// human-readable description. The lexer continues scanning afterward.
    Error(String),
}

/// Comment/blank-line trivia attached to the token that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trivia {
    /// Comment text in source order; each entry is one `//` line or one
    /// `/* */` block, already stripped of its delimiters.
    pub leading_comments: Vec<String>,
    /// A comment on the same line as, and after, the previous significant
    /// token (`x; // like this`).
    pub trailing_comment: Option<String>,
    /// Number of fully-blank lines immediately preceding this token (after
    /// any leading comments), so the parser can re-emit `blank` statements.
    pub blank_lines_before: u32,
}

impl Trivia {
    pub fn empty() -> Self {
        Trivia {
            leading_comments: Vec::new(),
            trailing_comment: None,
            blank_lines_before: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.leading_comments.is_empty()
            && self.trailing_comment.is_none()
            && self.blank_lines_before == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub trivia: Trivia,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, trivia: Trivia) -> Self {
        Token { kind, span, trivia }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {}", self.kind, self.span)
    }
}
