//! Expression parsing: Pratt-style operator-precedence climbing (§4.2).
//!
//! Precedence, loosest to tightest: `??` < `||` < `&&` < equality <
//! relational < range < additive < multiplicative < unary < postfix
//! (call/member/index) < primary.

use super::{ParseError, Parser};
use crate::ast::expr::{BinaryOp, Expr, ExprKind, Literal, ObjectField, TemplatePart, UnaryOp};
use crate::ast::types::Type;
use crate::token::{Keyword, TokenKind};

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    /// `=` binds loosest of all and is right-associative: `a = b = c`
    /// assigns `b = c` first. The left-hand side is whatever
    /// `parse_coalesce` produced; the validator (not the parser) rejects
    /// targets that aren't an identifier/member/index expression, so a
    /// malformed target still gets a precise diagnostic location.
    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_coalesce()?;
        if self.matches(&TokenKind::Assign) {
            let value = self.parse_assignment()?;
            let span = target.span.merge(&value.span);
            let id = self.ids.next();
            return Ok(Expr::new(
                id,
                ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                span,
            ));
        }
        Ok(target)
    }

    fn parse_coalesce(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_or()?;
        while self.matches(&TokenKind::QuestionQuestion) {
            let right = self.parse_or()?;
            let span = left.span.merge(&right.span);
            let id = self.ids.next();
            left = Expr::new(
                id,
                ExprKind::Coalesce {
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.matches(&TokenKind::OrOr) {
            left = self.binary(left, BinaryOp::Or, Self::parse_and)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.matches(&TokenKind::AndAnd) {
            left = self.binary(left, BinaryOp::And, Self::parse_equality)?;
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            left = self.binary(left, op, Self::parse_relational)?;
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_range()?;
        loop {
            match self.peek_kind() {
                TokenKind::Lt => {
                    self.advance();
                    left = self.binary(left, BinaryOp::Lt, Self::parse_range)?;
                }
                TokenKind::Gt => {
                    self.advance();
                    left = self.binary(left, BinaryOp::Gt, Self::parse_range)?;
                }
                TokenKind::LtEq => {
                    self.advance();
                    left = self.binary(left, BinaryOp::LtEq, Self::parse_range)?;
                }
                TokenKind::GtEq => {
                    self.advance();
                    left = self.binary(left, BinaryOp::GtEq, Self::parse_range)?;
                }
                TokenKind::Keyword(Keyword::Is) => {
                    self.advance();
                    let ty = self.parse_type()?;
                    let span = left.span.clone();
                    let id = self.ids.next();
                    left = Expr::new(
                        id,
                        ExprKind::IsType {
                            value: Box::new(left),
                            ty,
                        },
                        span,
                    );
                }
                TokenKind::Keyword(Keyword::As) => {
                    self.advance();
                    let ty = self.parse_type()?;
                    let span = left.span.clone();
                    let id = self.ids.next();
                    left = Expr::new(
                        id,
                        ExprKind::Cast {
                            value: Box::new(left),
                            ty,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(left)
    }

    /// `a..b` / `a..<b` — ranges are not generally nestable as sub-expressions
    /// in other arithmetic, but parsing them at this precedence lets them
    /// appear as loop/case bounds uniformly with any other expression.
    fn parse_range(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        let inclusive = match self.peek_kind() {
            TokenKind::DotDot => true,
            TokenKind::DotDotLt => false,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        let span = left.span.merge(&right.span);
        let id = self.ids.next();
        Ok(Expr::new(
            id,
            ExprKind::Range {
                start: Box::new(left),
                end: Box::new(right),
                inclusive,
            },
            span,
        ))
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            left = self.binary(left, op, Self::parse_multiplicative)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            left = self.binary(left, op, Self::parse_unary)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::Minus => {
                let start = self.advance().span;
                let operand = self.parse_unary()?;
                let span = start.merge(&operand.span);
                let id = self.ids.next();
                Ok(Expr::new(
                    id,
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::Bang => {
                let start = self.advance().span;
                let operand = self.parse_unary()?;
                let span = start.merge(&operand.span);
                let id = self.ids.next();
                Ok(Expr::new(
                    id,
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::Keyword(Keyword::Await) => {
                let start = self.advance().span;
                let operand = self.parse_unary()?;
                let span = start.merge(&operand.span);
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Await(Box::new(operand)), span))
            }
            TokenKind::Keyword(Keyword::Async) => {
                let start = self.advance().span;
                let operand = self.parse_unary()?;
                let span = start.merge(&operand.span);
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Async(Box::new(operand)), span))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = match self.peek_kind().clone() {
                        TokenKind::Identifier(n) => {
                            self.advance();
                            n
                        }
                        TokenKind::StringLiteral(n) => {
                            self.advance();
                            n
                        }
                        _ => return Err(self.unexpected("member name")),
                    };
                    let span = expr.span.clone();
                    let id = self.ids.next();
                    expr = Expr::new(
                        id,
                        ExprKind::Member {
                            object: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    let span = expr.span.clone();
                    let id = self.ids.next();
                    expr = Expr::new(
                        id,
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    let (args, _) = self.parse_args()?;
                    let span = expr.span.clone();
                    let id = self.ids.next();
                    expr = Expr::new(
                        id,
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            type_args: None,
                        },
                        span,
                    );
                }
                TokenKind::Lt if self.looks_like_type_arg_call() => {
                    let type_args = self.parse_type_arg_list()?;
                    let (args, _) = self.parse_args()?;
                    let span = expr.span.clone();
                    let id = self.ids.next();
                    expr = Expr::new(
                        id,
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            type_args: Some(type_args),
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Disambiguates `identity<int>(...)` from a relational `<` by scanning
    /// ahead for a closing `>` followed directly by `(`. Purely a heuristic
    /// used only at explicit generic call sites (§4.4): the grammar never
    /// needs this disambiguation anywhere else.
    fn looks_like_type_arg_call(&self) -> bool {
        let mut depth = 0i32;
        let mut offset = 0usize;
        loop {
            match self.peek_at(offset) {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.peek_at(offset + 1), TokenKind::LParen);
                    }
                }
                TokenKind::Semicolon | TokenKind::LBrace | TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
            if offset > 64 {
                return false;
            }
        }
    }

    fn parse_type_arg_list(&mut self) -> Result<Vec<Type>, ParseError> {
        self.expect(TokenKind::Lt, "'<'")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::Gt) {
            loop {
                args.push(self.parse_type()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Gt, "'>'")?;
        Ok(args)
    }

    fn parse_args(&mut self) -> Result<(Vec<Expr>, crate::span::Span), ParseError> {
        let start = self.expect(TokenKind::LParen, "'('")?.span;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RParen, "')'")?.span;
        Ok((args, start.merge(&end)))
    }

    fn binary(
        &mut self,
        left: Expr,
        op: BinaryOp,
        rhs: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let right = rhs(self)?;
        let span = left.span.merge(&right.span);
        let id = self.ids.next();
        Ok(Expr::new(
            id,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().cloned().ok_or_else(|| self.unexpected("expression"))?;
        let span = tok.span.clone();
        match tok.kind {
            TokenKind::IntLiteral(v) => {
                self.advance();
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Literal(Literal::Int(v)), span))
            }
            TokenKind::FloatLiteral(text) => {
                self.advance();
                let id = self.ids.next();
                Ok(Expr::new(
                    id,
                    ExprKind::Literal(Literal::Fractional(text)),
                    span,
                ))
            }
            TokenKind::CharLiteral(c) => {
                self.advance();
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Literal(Literal::Char(c)), span))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Literal(Literal::Str(s)), span))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Literal(Literal::Bool(true)), span))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Literal(Literal::Bool(false)), span))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Literal(Literal::Null), span))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::This, span))
            }
            TokenKind::TaggedTemplateTag(tag) => {
                self.advance();
                self.parse_template(Some(tag))
            }
            TokenKind::TemplateText(_) => self.parse_template(None),
            TokenKind::Dot => {
                self.advance();
                let name = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("enum member name")),
                };
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::EnumShorthand(name), span))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check(&TokenKind::LBrace) && self.object_literal_follows() {
                    return self.parse_object_literal(Some(name), span);
                }
                let id = self.ids.next();
                Ok(Expr::new(id, ExprKind::Identifier(name), span))
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                let class_name = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("class name")),
                };
                let type_args = if self.check(&TokenKind::Lt) {
                    Some(self.parse_type_arg_list()?)
                } else {
                    None
                };
                let (args, end_span) = self.parse_args()?;
                let id = self.ids.next();
                Ok(Expr::new(
                    id,
                    ExprKind::New {
                        class_name,
                        args,
                        type_args,
                    },
                    span.merge(&end_span),
                ))
            }
            TokenKind::LParen => {
                if self.lambda_follows() {
                    return self.parse_lambda();
                }
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array_literal(span),
            TokenKind::LBrace => self.parse_map_or_set_literal(span),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// An object literal is only recognized at a position where a class
    /// identifier was just consumed and context allows construction syntax.
    /// Ambiguity with a following block is resolved by checking that a
    /// `{` is immediately followed by either `}` or `identifier:`.
    fn object_literal_follows(&self) -> bool {
        matches!(self.peek_at(1), TokenKind::RBrace)
            || (matches!(self.peek_at(1), TokenKind::Identifier(_))
                && matches!(self.peek_at(2), TokenKind::Colon))
    }

    fn parse_object_literal(
        &mut self,
        class_name: Option<String>,
        start: crate::span::Span,
    ) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let name = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("field name")),
                };
                self.expect(TokenKind::Colon, "':'")?;
                let value = self.parse_expr()?;
                fields.push(ObjectField { name, value });
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        let id = self.ids.next();
        Ok(Expr::new(
            id,
            ExprKind::ObjectLiteral { class_name, fields },
            start.merge(&end),
        ))
    }

    fn parse_array_literal(&mut self, start: crate::span::Span) -> Result<Expr, ParseError> {
        self.advance(); // '['
        let mut elems = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                elems.push(self.parse_expr()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RBracket, "']'")?.span;
        let id = self.ids.next();
        Ok(Expr::new(
            id,
            ExprKind::ArrayLiteral(elems),
            start.merge(&end),
        ))
    }

    /// `{}` is an empty map literal; `{k: v, ...}` disambiguates map vs set
    /// by whether a `:` follows the first element.
    fn parse_map_or_set_literal(&mut self, start: crate::span::Span) -> Result<Expr, ParseError> {
        self.advance(); // '{'
        if self.check(&TokenKind::RBrace) {
            let end = self.advance().span;
            let id = self.ids.next();
            return Ok(Expr::new(
                id,
                ExprKind::MapLiteral(Vec::new()),
                start.merge(&end),
            ));
        }
        let first_key = self.parse_expr()?;
        if self.matches(&TokenKind::Colon) {
            let first_val = self.parse_expr()?;
            let mut entries = vec![(first_key, first_val)];
            while self.matches(&TokenKind::Comma) {
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                let k = self.parse_expr()?;
                self.expect(TokenKind::Colon, "':'")?;
                let v = self.parse_expr()?;
                entries.push((k, v));
            }
            let end = self.expect(TokenKind::RBrace, "'}'")?.span;
            let id = self.ids.next();
            Ok(Expr::new(
                id,
                ExprKind::MapLiteral(entries),
                start.merge(&end),
            ))
        } else {
            let mut elems = vec![first_key];
            while self.matches(&TokenKind::Comma) {
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                elems.push(self.parse_expr()?);
            }
            let end = self.expect(TokenKind::RBrace, "'}'")?.span;
            let id = self.ids.next();
            Ok(Expr::new(
                id,
                ExprKind::SetLiteral(elems),
                start.merge(&end),
            ))
        }
    }

    /// Heuristic lookahead: `(` starts a lambda when, scanning forward to
    /// the matching `)`, that close paren is followed by `=>`.
    fn lambda_follows(&self) -> bool {
        let mut depth = 0i32;
        let mut offset = 0usize;
        loop {
            match self.peek_at(offset) {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.peek_at(offset + 1), TokenKind::Arrow);
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
            if offset > 256 {
                return false;
            }
        }
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::LParen, "'('")?.span;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let name = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("parameter name")),
                };
                let ty = if self.matches(&TokenKind::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                params.push((name, ty));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let ret = if self.matches(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Arrow, "'=>'")?;
        let body = if self.check(&TokenKind::LBrace) {
            self.parse_block_stmt()?
        } else {
            let expr_span = self.peek().map(|t| t.span.clone()).unwrap_or_else(|| start.clone());
            let e = self.parse_expr()?;
            let id = self.ids.next();
            crate::ast::stmt::Stmt::new(
                id,
                crate::ast::stmt::StmtKind::Return(Some(e)),
                expr_span,
            )
        };
        let end = body.span.clone();
        let id = self.ids.next();
        Ok(Expr::new(
            id,
            ExprKind::Lambda {
                params,
                ret,
                body: Box::new(body),
            },
            start.merge(&end),
        ))
    }

    fn parse_template(&mut self, tag: Option<String>) -> Result<Expr, ParseError> {
        let start = self.peek().unwrap().span.clone();
        let mut parts = Vec::new();
        loop {
            match self.peek_kind().clone() {
                TokenKind::TemplateText(text) => {
                    let end = self.advance().span;
                    parts.push(TemplatePart::Text(text));
                    // A text chunk not immediately followed by further
                    // interpolation means the template literal is done.
                    if !matches!(
                        self.peek_kind(),
                        TokenKind::IntLiteral(_)
                            | TokenKind::FloatLiteral(_)
                            | TokenKind::Identifier(_)
                            | TokenKind::StringLiteral(_)
                            | TokenKind::Keyword(_)
                            | TokenKind::LParen
                            | TokenKind::Minus
                            | TokenKind::Bang
                    ) {
                        let id = self.ids.next();
                        return Ok(Expr::new(
                            id,
                            ExprKind::Template { tag, parts },
                            start.merge(&end),
                        ));
                    }
                }
                _ => {
                    let e = self.parse_expr()?;
                    parts.push(TemplatePart::Expr(Box::new(e)));
                }
            }
        }
    }
}
