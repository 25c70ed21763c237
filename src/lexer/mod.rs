//! Phase 1: Lexer — source text to a token stream with trivia attached.
//!
//! Step 1.a: scan raw characters into tokens, tracking blank lines and
//!   comments as trivia on the *next* significant token.
//! Step 1.b: re-enter expression-lexing mode inside `${ … }` template
//!   interpolations and return to string-lexing mode at the matching `}`.
//!
//! Numeric literals never support scientific notation by design (§9 open
//! question): `1e10` scans as `IntLiteral(1)` followed by `Identifier("e10")`.

mod escapes;

use crate::span::{Position, Span};
use crate::token::{Keyword, Token, TokenKind, Trivia};
use std::rc::Rc;

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    file: Rc<str>,
    /// Template-string nesting: each entry is the brace depth at which the
    /// corresponding `${` was opened, so `}` can tell "end of interpolation"
    /// from "end of some nested block expression" apart.
    template_stack: Vec<u32>,
    brace_depth: u32,
}

impl Lexer {
    pub fn new(source: &str, filename: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file: Rc::from(filename),
            template_stack: Vec::new(),
            brace_depth: 0,
        }
    }

    /// Scans the entire source into a finite token sequence ending in EOF.
    pub fn tokenize(mut self) -> Vec<Token> {
        let span = tracing::debug_span!("lexer", file = %self.file);
        let _enter = span.enter();

        let mut tokens = Vec::new();
        loop {
            let trivia = self.skip_trivia();
            let start = self.position();
            let kind = self.scan_token();
            let end = self.position();
            let token_span = Span::new(self.file.clone(), start, end);
            let is_eof = matches!(kind, TokenKind::Eof);
            tokens.push(Token::new(kind, token_span, trivia));
            if is_eof {
                break;
            }
        }
        tracing::debug!(count = tokens.len(), "lexing complete");
        tokens
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.pos as u32,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes whitespace, line/block comments and blank lines, producing
    /// the trivia bundle attached to the token that follows.
    fn skip_trivia(&mut self) -> Trivia {
        let mut trivia = Trivia::empty();
        let mut blank_lines = 0u32;
        let mut saw_newline_since_token = false;
        let mut trailing_candidate: Option<String> = None;

        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\n') => {
                    if saw_newline_since_token {
                        blank_lines += 1;
                    }
                    saw_newline_since_token = true;
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    let text = self.scan_line_comment();
                    if !saw_newline_since_token && trivia.leading_comments.is_empty() {
                        trailing_candidate = Some(text);
                    } else {
                        trivia.leading_comments.push(text);
                    }
                    saw_newline_since_token = false;
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let text = self.scan_block_comment();
                    trivia.leading_comments.push(text);
                    saw_newline_since_token = false;
                }
                _ => break,
            }
        }
        trivia.trailing_comment = trailing_candidate;
        trivia.blank_lines_before = blank_lines;
        trivia
    }

    fn scan_line_comment(&mut self) -> String {
        self.advance(); // '/'
        self.advance(); // '/'
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.advance();
        }
        text.trim().to_string()
    }

    fn scan_block_comment(&mut self) -> String {
        self.advance(); // '/'
        self.advance(); // '*'
        let mut text = String::new();
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('*'), Some('/')) => {
                    self.advance();
                    self.advance();
                    break;
                }
                (Some(_), _) => {
                    text.push(self.advance().unwrap());
                }
                (None, _) => break, // unterminated; caller sees EOF next
            }
        }
        text.trim().to_string()
    }

    fn scan_token(&mut self) -> TokenKind {
        let Some(c) = self.peek() else {
            return TokenKind::Eof;
        };

        if c.is_ascii_digit() {
            return self.scan_number();
        }
        if is_ident_start(c) {
            return self.scan_identifier_or_tagged_template();
        }
        match c {
            '"' => self.scan_quoted('"'),
            '\'' => self.scan_char(),
            '`' => self.scan_template(),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => {
                self.brace_depth += 1;
                self.single(TokenKind::LBrace)
            }
            '}' => {
                if self.template_stack.last() == Some(&self.brace_depth) {
                    self.template_stack.pop();
                    self.advance();
                    return self.resume_template();
                }
                self.brace_depth = self.brace_depth.saturating_sub(1);
                self.single(TokenKind::RBrace)
            }
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '.' => {
                self.advance();
                if self.eat('.') {
                    if self.eat('<') {
                        TokenKind::DotDotLt
                    } else {
                        TokenKind::DotDot
                    }
                } else {
                    TokenKind::Dot
                }
            }
            ':' => self.single(TokenKind::Colon),
            '?' => {
                self.advance();
                if self.eat('?') {
                    TokenKind::QuestionQuestion
                } else {
                    TokenKind::Question
                }
            }
            '=' => {
                self.advance();
                if self.eat('=') {
                    TokenKind::Eq
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Assign
                }
            }
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Percent),
            '!' => {
                self.advance();
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                self.advance();
                if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.advance();
                if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                self.advance();
                if self.eat('&') {
                    TokenKind::AndAnd
                } else {
                    TokenKind::Error("unexpected '&'".to_string())
                }
            }
            '|' => {
                self.advance();
                if self.eat('|') {
                    TokenKind::OrOr
                } else {
                    TokenKind::Pipe
                }
            }
            other => {
                self.advance();
                TokenKind::Error(format!("unexpected character '{other}'"))
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        // Scientific notation is unsupported by design: a digit run followed
        // by 'e'/'E' is deliberately NOT consumed here, so `1e10` becomes an
        // int literal `1` followed by the identifier `e10`.
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap()); // '.'
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
            return TokenKind::FloatLiteral(text);
        }
        match text.parse::<i64>() {
            Ok(v) => TokenKind::IntLiteral(v),
            Err(_) => TokenKind::Error(format!("integer literal out of range: {text}")),
        }
    }

    fn scan_identifier_or_tagged_template(&mut self) -> TokenKind {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            text.push(self.advance().unwrap());
        }
        // Tagged template adjacency must be observed by the lexer: no
        // whitespace between identifier and opening quote (§9, §4.2).
        if matches!(self.peek(), Some('`') | Some('"')) {
            return TokenKind::TaggedTemplateTag(text);
        }
        if let Some(kw) = Keyword::lookup(&text) {
            TokenKind::Keyword(kw)
        } else {
            TokenKind::Identifier(text)
        }
    }

    fn scan_quoted(&mut self, quote: char) -> TokenKind {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.advance();
                    return TokenKind::StringLiteral(text);
                }
                Some('\\') => {
                    self.advance();
                    match escapes::scan_escape(self) {
                        Ok(c) => text.push(c),
                        Err(msg) => return TokenKind::Error(msg),
                    }
                }
                Some('\n') | None => {
                    return TokenKind::Error("unterminated string literal".to_string());
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_char(&mut self) -> TokenKind {
        self.advance(); // opening '
        let c = match self.peek() {
            Some('\\') => {
                self.advance();
                match escapes::scan_escape(self) {
                    Ok(c) => c,
                    Err(msg) => return TokenKind::Error(msg),
                }
            }
            Some(c) if c != '\'' => {
                self.advance();
                c
            }
            _ => return TokenKind::Error("unterminated char literal".to_string()),
        };
        if self.eat('\'') {
            TokenKind::CharLiteral(c)
        } else {
            TokenKind::Error("char literal must contain exactly one character".to_string())
        }
    }

    /// Scans the text chunk of a template string, beginning at `` ` `` or
    /// resuming after a `${ … }` interpolation closes.
    fn scan_template(&mut self) -> TokenKind {
        self.advance(); // opening backtick
        self.scan_template_text()
    }

    fn resume_template(&mut self) -> TokenKind {
        self.scan_template_text()
    }

    fn scan_template_text(&mut self) -> TokenKind {
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('`') => {
                    self.advance();
                    return TokenKind::TemplateText(text);
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.advance();
                    self.advance();
                    self.template_stack.push(self.brace_depth);
                    self.brace_depth += 1;
                    // The pending text chunk is returned now; the caller's
                    // next call to `scan_token` will see brace_depth bumped
                    // and proceed in expression mode until the matching `}`.
                    return TokenKind::TemplateText(text);
                }
                Some('\\') => {
                    self.advance();
                    match escapes::scan_escape(self) {
                        Ok(c) => text.push(c),
                        Err(msg) => return TokenKind::Error(msg),
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
                None => return TokenKind::Error("unterminated template string".to_string()),
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, "test.tx")
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scientific_notation_is_not_special_cased() {
        let ks = kinds("1e10");
        assert_eq!(
            ks,
            vec![
                TokenKind::IntLiteral(1),
                TokenKind::Identifier("e10".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[rstest]
    #[case("..", TokenKind::DotDot)]
    #[case("..<", TokenKind::DotDotLt)]
    fn range_operators(#[case] src: &str, #[case] expected: TokenKind) {
        let ks = kinds(src);
        assert_eq!(ks[0], expected);
    }

    #[test]
    fn char_vs_string_literal() {
        let ks = kinds("'x' \"x\"");
        assert_eq!(ks[0], TokenKind::CharLiteral('x'));
        assert_eq!(ks[1], TokenKind::StringLiteral("x".to_string()));
    }

    #[test]
    fn trailing_comment_attaches_to_same_line_token() {
        let tokens = Lexer::new("let x = 1; // comment\nlet y = 2;", "t.tx").tokenize();
        // find the `let` token that starts line 2
        let y_let = tokens
            .iter()
            .find(|t| t.span.start.line == 2)
            .expect("second let token");
        assert_eq!(y_let.trivia.leading_comments, vec!["comment".to_string()]);
    }

    #[test]
    fn blank_line_counted_once_between_tokens() {
        let tokens = Lexer::new("let x = 1;\n\n\nlet y = 2;", "t.tx").tokenize();
        let y_let = tokens
            .iter()
            .find(|t| t.span.start.line == 4)
            .expect("second let token");
        assert_eq!(y_let.trivia.blank_lines_before, 2);
    }

    #[test]
    fn tagged_template_requires_no_whitespace() {
        let ks = kinds("html`<b>`");
        assert!(matches!(ks[0], TokenKind::TaggedTemplateTag(ref s) if s == "html"));
        let ks2 = kinds("html `<b>`");
        assert!(matches!(ks2[0], TokenKind::Identifier(ref s) if s == "html"));
    }

    #[test]
    fn template_interpolation_reenters_expression_mode() {
        let ks = kinds("`a${1+b}c`");
        assert_eq!(ks[0], TokenKind::TemplateText("a".to_string()));
        assert_eq!(ks[1], TokenKind::IntLiteral(1));
        assert_eq!(ks[2], TokenKind::Plus);
        assert_eq!(ks[3], TokenKind::Identifier("b".to_string()));
        assert_eq!(ks[4], TokenKind::TemplateText("c".to_string()));
    }
}
