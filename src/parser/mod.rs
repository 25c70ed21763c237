//! Phase 2: Parser — tokens to `Program`, with Pratt-style expression
//! parsing and panic-mode error recovery (§4.2).
//!
//! Trivia preservation: a leading comment or blank-line run in front of a
//! token becomes a `blank` statement in the enclosing statement list
//! *before* that token's real statement is parsed (§4.2, §9).

mod decl;
mod error;
mod expr;
mod stmt;

pub use error::ParseError;

use crate::ast::ids::NodeIdGen;
use crate::ast::{Item, Program};
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub(crate) ids: NodeIdGen,
    pub errors: Vec<ParseError>,
}

pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

/// Parses one file's token stream into a `Program` plus any parse errors.
/// Parsing never aborts early: on a syntax error the parser records the
/// error and synchronizes at the next statement boundary (§4.2).
pub fn parse(tokens: Vec<Token>) -> ParseResult {
    let (result, _ids) = parse_with_ids(tokens, NodeIdGen::new());
    result
}

/// Parses one file's token stream using a caller-supplied id generator, and
/// hands the generator back so the next file's parse continues the same
/// sequence. The module loader threads one generator across every file in a
/// compilation set so `NodeId`s stay globally unique — the validator's
/// narrowing map and scope-tracker notes are keyed by `NodeId` across the
/// whole project, not just within one file.
pub fn parse_with_ids(tokens: Vec<Token>, ids: NodeIdGen) -> (ParseResult, NodeIdGen) {
    let span = tracing::debug_span!("parser", tokens = tokens.len());
    let _enter = span.enter();

    let mut parser = Parser::with_ids(tokens, ids);
    let program = parser.parse_program();
    tracing::debug!(
        items = program.items.len(),
        errors = parser.errors.len(),
        "parse complete"
    );
    (
        ParseResult {
            program,
            errors: parser.errors,
        },
        parser.ids,
    )
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser::with_ids(tokens, NodeIdGen::new())
    }

    fn with_ids(tokens: Vec<Token>, ids: NodeIdGen) -> Self {
        Parser {
            tokens,
            pos: 0,
            ids,
            errors: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut items = Vec::new();
        while !self.is_at_end() {
            self.emit_leading_blanks(&mut items);
            if self.is_at_end() {
                break;
            }
            match self.parse_top_level_item() {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        Program::new(items)
    }

    /// Turns a token's leading-comment/blank-line trivia into `blank`
    /// statements inserted before it (§4.2, §9).
    pub(crate) fn emit_leading_blanks(&mut self, items: &mut Vec<Item>) {
        let Some(trivia) = self.peek().map(|t| t.trivia.clone()) else {
            return;
        };
        if trivia.is_empty() {
            return;
        }
        let span = self.peek().unwrap().span.clone();
        if trivia.blank_lines_before > 0 {
            let id = self.ids.next();
            items.push(Item::Stmt(crate::ast::stmt::Stmt::new(
                id,
                crate::ast::stmt::StmtKind::Blank {
                    comment: None,
                    blank_lines: trivia.blank_lines_before,
                },
                span.clone(),
            )));
        }
        for comment in &trivia.leading_comments {
            let id = self.ids.next();
            items.push(Item::Stmt(crate::ast::stmt::Stmt::new(
                id,
                crate::ast::stmt::StmtKind::Blank {
                    comment: Some(comment.clone()),
                    blank_lines: 0,
                },
                span.clone(),
            )));
        }
    }

    pub(crate) fn emit_leading_blanks_stmts(&mut self, stmts: &mut Vec<crate::ast::stmt::Stmt>) {
        let Some(trivia) = self.peek().map(|t| t.trivia.clone()) else {
            return;
        };
        if trivia.is_empty() {
            return;
        }
        let span = self.peek().unwrap().span.clone();
        if trivia.blank_lines_before > 0 {
            let id = self.ids.next();
            stmts.push(crate::ast::stmt::Stmt::new(
                id,
                crate::ast::stmt::StmtKind::Blank {
                    comment: None,
                    blank_lines: trivia.blank_lines_before,
                },
                span.clone(),
            ));
        }
        for comment in &trivia.leading_comments {
            let id = self.ids.next();
            stmts.push(crate::ast::stmt::Stmt::new(
                id,
                crate::ast::stmt::StmtKind::Blank {
                    comment: Some(comment.clone()),
                    blank_lines: 0,
                },
                span.clone(),
            ));
        }
    }

    // --- token cursor -----------------------------------------------------

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(t) if t.is_eof() => ParseError::UnexpectedEof {
                span: t.span.clone(),
                expected: expected.to_string(),
            },
            Some(t) => ParseError::UnexpectedToken {
                span: t.span.clone(),
                expected: expected.to_string(),
                found: format!("{:?}", t.kind),
            },
            None => ParseError::UnexpectedEof {
                span: crate::span::Span::synthetic(std::rc::Rc::from("")),
                expected: expected.to_string(),
            },
        }
    }

    /// Synchronizes at the next statement boundary: `;`, `}`, or a
    /// top-level keyword (§4.2).
    pub(crate) fn synchronize(&mut self) {
        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => return,
                TokenKind::Keyword(k) if decl::starts_top_level_item(*k) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::decl::Decl;
    use crate::ast::stmt::{CaseLabel, ForOfSource, StmtKind};
    use crate::ast::Item;
    use crate::lexer::Lexer;

    fn parse_ok(src: &str) -> Program {
        let tokens = Lexer::new(src, "t.tx").tokenize();
        let result = parse(tokens);
        assert!(result.errors.is_empty(), "parse errors: {:?}", result.errors);
        result.program
    }

    #[test]
    fn class_with_fields_and_a_quoted_field_name() {
        let program = parse_ok(
            r#"
            class Point {
                const kind: string = "point";
                x: int;
                "my-field": int;
            }
            "#,
        );
        let Some(Decl::Class(class)) = program.decls().next() else {
            panic!("expected a class decl");
        };
        assert_eq!(class.name, "Point");
        assert_eq!(class.fields.len(), 3);
        assert!(class.fields.iter().any(|f| f.name == "my-field"));
    }

    #[test]
    fn computed_property_names_are_rejected() {
        let tokens = Lexer::new("class Point { [expr]: int; }", "t.tx").tokenize();
        let result = parse(tokens);
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn extern_class_header_binding_is_recorded() {
        let program = parse_ok(r#"extern class Vec from { cpp: "vector", js: "vec.js" }"#);
        let Some(Decl::ExternClass(ext)) = program.decls().next() else {
            panic!("expected an extern class decl");
        };
        assert_eq!(ext.name, "Vec");
        assert_eq!(ext.binding.cpp.as_deref(), Some("vector"));
        assert_eq!(ext.binding.js.as_deref(), Some("vec.js"));
    }

    #[test]
    fn generic_function_declares_its_type_parameter() {
        let program = parse_ok("function identity<T>(v: T): T { return v; }");
        let Some(Decl::Function(f)) = program.decls().next() else {
            panic!("expected a function decl");
        };
        assert!(f.is_generic());
        assert_eq!(f.type_params[0].name, "T");
    }

    #[test]
    fn range_for_of_is_inclusive_or_exclusive_by_operator() {
        let program = parse_ok(
            r#"
            function f(): void {
                for (const i of 0..5) {}
                for (const j of 0..<5) {}
            }
            "#,
        );
        let Some(Decl::Function(f)) = program.decls().next() else {
            panic!("expected a function decl");
        };
        let StmtKind::Block(stmts) = &f.body.kind else {
            panic!("expected a block body");
        };
        let ranges: Vec<_> = stmts
            .iter()
            .filter_map(|s| match &s.kind {
                StmtKind::ForOf { source, .. } => Some(source),
                _ => None,
            })
            .collect();
        assert!(matches!(ranges[0], ForOfSource::Range { inclusive: true, .. }));
        assert!(matches!(ranges[1], ForOfSource::Range { inclusive: false, .. }));
    }

    #[test]
    fn switch_parses_literal_null_and_range_cases() {
        let program = parse_ok(
            r#"
            function f(x: int): void {
                switch (x) {
                    case 0..5: break;
                    case null: break;
                    default: break;
                }
            }
            "#,
        );
        let Some(Decl::Function(f)) = program.decls().next() else {
            panic!("expected a function decl");
        };
        let StmtKind::Block(stmts) = &f.body.kind else {
            panic!("expected a block body");
        };
        let StmtKind::Switch { cases, .. } = &stmts[0].kind else {
            panic!("expected a switch statement");
        };
        assert!(matches!(cases[0].labels[0], CaseLabel::Range(0, 5)));
        assert!(matches!(cases[1].labels[0], CaseLabel::Null));
    }

    #[test]
    fn standalone_comment_becomes_a_blank_statement() {
        let program = parse_ok(
            r#"
            function f(): void {
                // a standalone comment
                let x = 1;
            }
            "#,
        );
        let Some(Decl::Function(f)) = program.decls().next() else {
            panic!("expected a function decl");
        };
        let StmtKind::Block(stmts) = &f.body.kind else {
            panic!("expected a block body");
        };
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Blank { comment: Some(c), .. } if c == "a standalone comment"
        ));
    }

    #[test]
    fn syntax_error_recovers_at_the_next_top_level_item() {
        let tokens = Lexer::new(
            "let x: int = ; function ok(): int { return 1; }",
            "t.tx",
        )
        .tokenize();
        let result = parse(tokens);
        assert_eq!(result.errors.len(), 1);
        assert!(result
            .program
            .decls()
            .any(|d| matches!(d, Decl::Function(f) if f.name == "ok")));
    }

    #[test]
    fn async_call_and_await_parse_as_distinct_expression_forms() {
        let program = parse_ok(
            r#"
            async function work(): int { return 1; }
            function f(): void {
                let h = async work();
                let v = await h;
            }
            "#,
        );
        assert_eq!(program.decls().count(), 2);
        let Some(Item::Decl(Decl::Function(f))) = program.items.last() else {
            panic!("expected the second function decl");
        };
        let StmtKind::Block(stmts) = &f.body.kind else {
            panic!("expected a block body");
        };
        assert_eq!(stmts.len(), 2);
    }
}
