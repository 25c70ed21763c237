//! Statement parsing (§4.2), including trivia-to-`blank` conversion inline
//! in every statement list so comments and blank-line runs round-trip.

use super::{ParseError, Parser};
use crate::ast::stmt::{CaseLabel, ForOfSource, Stmt, StmtKind, SwitchCase};
use crate::token::{Keyword, TokenKind};

impl Parser {
    pub(crate) fn parse_block_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.span;
        let mut stmts = Vec::new();
        loop {
            self.emit_leading_blanks_stmts(&mut stmts);
            if self.check(&TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        let id = self.ids.next();
        Ok(Stmt::new(id, StmtKind::Block(stmts), start.merge(&end)))
    }

    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::LBrace => self.parse_block_stmt(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_stmt(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_stmt(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_stmt(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch_stmt(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_stmt(),
            TokenKind::Keyword(Keyword::Break) => {
                let span = self.advance().span;
                self.matches(&TokenKind::Semicolon);
                let id = self.ids.next();
                Ok(Stmt::new(id, StmtKind::Break, span))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let span = self.advance().span;
                self.matches(&TokenKind::Semicolon);
                let id = self.ids.next();
                Ok(Stmt::new(id, StmtKind::Continue, span))
            }
            k if super::decl::starts_local_decl(&k) => {
                let decl = self.parse_decl()?;
                let span = decl.span().clone();
                self.matches(&TokenKind::Semicolon);
                let id = self.ids.next();
                Ok(Stmt::new(id, StmtKind::Declaration(decl), span))
            }
            _ => {
                let expr = self.parse_expr()?;
                let span = expr.span.clone();
                self.matches(&TokenKind::Semicolon);
                let id = self.ids.next();
                Ok(Stmt::new(id, StmtKind::Expression(expr), span))
            }
        }
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // 'if'
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.matches(&TokenKind::Keyword(Keyword::Else)) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        let end = else_branch
            .as_ref()
            .map(|s| s.span.clone())
            .unwrap_or_else(|| then_branch.span.clone());
        let id = self.ids.next();
        Ok(Stmt::new(
            id,
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            start.merge(&end),
        ))
    }

    /// Dispatches on whether a range or a general `for(;;)` header follows,
    /// since the surface grammar uses `for` for both plain C-style loops and
    /// `for (x of 0..10)` / `for (x of items)` iteration (§3).
    fn parse_for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // 'for'
        self.expect(TokenKind::LParen, "'('")?;
        if self.for_of_follows() {
            return self.parse_for_of_tail(start);
        }
        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_stmt()?))
        };
        if init.is_none() {
            self.expect(TokenKind::Semicolon, "';'")?;
        }
        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_stmt()?);
        let end = body.span.clone();
        let id = self.ids.next();
        Ok(Stmt::new(
            id,
            StmtKind::For {
                init,
                cond,
                step,
                body,
            },
            start.merge(&end),
        ))
    }

    /// Looks past an optional `let`/`const` and an identifier for `of`.
    fn for_of_follows(&self) -> bool {
        let mut offset = 0usize;
        if matches!(
            self.peek_at(0),
            TokenKind::Keyword(Keyword::Let) | TokenKind::Keyword(Keyword::Const)
        ) {
            offset += 1;
        }
        matches!(self.peek_at(offset), TokenKind::Identifier(_))
            && matches!(self.peek_at(offset + 1), TokenKind::Keyword(Keyword::Of))
    }

    fn parse_for_of_tail(&mut self, start: crate::span::Span) -> Result<Stmt, ParseError> {
        let is_const = self.matches(&TokenKind::Keyword(Keyword::Const));
        if !is_const {
            self.matches(&TokenKind::Keyword(Keyword::Let));
        }
        let binding = match self.peek_kind().clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.unexpected("loop variable")),
        };
        self.expect(TokenKind::Keyword(Keyword::Of), "'of'")?;
        let first = self.parse_expr()?;
        let source = if let crate::ast::expr::ExprKind::Range {
            start: s,
            end: e,
            inclusive,
        } = first.kind
        {
            ForOfSource::Range {
                start: *s,
                end: *e,
                inclusive,
            }
        } else {
            ForOfSource::Collection(first)
        };
        self.expect(TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_stmt()?);
        let end = body.span.clone();
        let id = self.ids.next();
        Ok(Stmt::new(
            id,
            StmtKind::ForOf {
                binding,
                is_const,
                source,
                body,
            },
            start.merge(&end),
        ))
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // 'while'
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_stmt()?);
        let end = body.span.clone();
        let id = self.ids.next();
        Ok(Stmt::new(id, StmtKind::While { cond, body }, start.merge(&end)))
    }

    /// `switch` cases accept a comma-separated list of value/`null`/range
    /// labels sharing one body, plus `default` (§3 `CaseLabel`).
    fn parse_switch_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // 'switch'
        self.expect(TokenKind::LParen, "'('")?;
        let subject = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let mut labels = Vec::new();
            loop {
                if self.matches(&TokenKind::Keyword(Keyword::Default)) {
                    labels.push(CaseLabel::Default);
                } else {
                    self.expect(TokenKind::Keyword(Keyword::Case), "'case'")?;
                    labels.push(self.parse_case_label()?);
                }
                self.expect(TokenKind::Colon, "':'")?;
                if matches!(
                    self.peek_kind(),
                    TokenKind::Keyword(Keyword::Case) | TokenKind::Keyword(Keyword::Default)
                ) {
                    continue;
                }
                break;
            }
            let mut body = Vec::new();
            while !matches!(
                self.peek_kind(),
                TokenKind::Keyword(Keyword::Case)
                    | TokenKind::Keyword(Keyword::Default)
                    | TokenKind::RBrace
            ) && !self.is_at_end()
            {
                self.emit_leading_blanks_stmts(&mut body);
                if matches!(
                    self.peek_kind(),
                    TokenKind::Keyword(Keyword::Case)
                        | TokenKind::Keyword(Keyword::Default)
                        | TokenKind::RBrace
                ) {
                    break;
                }
                body.push(self.parse_stmt()?);
            }
            cases.push(SwitchCase { labels, body });
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        let id = self.ids.next();
        Ok(Stmt::new(
            id,
            StmtKind::Switch { subject, cases },
            start.merge(&end),
        ))
    }

    fn parse_case_label(&mut self) -> Result<CaseLabel, ParseError> {
        if self.matches(&TokenKind::Keyword(Keyword::Null)) {
            return Ok(CaseLabel::Null);
        }
        let first = self.parse_expr()?;
        if let crate::ast::expr::ExprKind::Range { start, end, .. } = &first.kind {
            if let (
                crate::ast::expr::ExprKind::Literal(crate::ast::expr::Literal::Int(a)),
                crate::ast::expr::ExprKind::Literal(crate::ast::expr::Literal::Int(b)),
            ) = (&start.kind, &end.kind)
            {
                return Ok(CaseLabel::Range(*a, *b));
            }
        }
        Ok(CaseLabel::Value(first))
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // 'return'
        let value = if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::RBrace) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let end = value.as_ref().map(|e| e.span.clone()).unwrap_or_else(|| start.clone());
        self.matches(&TokenKind::Semicolon);
        let id = self.ids.next();
        Ok(Stmt::new(id, StmtKind::Return(value), start.merge(&end)))
    }
}
