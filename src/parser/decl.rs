//! Declaration parsing (§3, §4.2): functions, classes, extern classes,
//! enums, interfaces, type aliases, variables and imports.

use super::{ParseError, Parser};
use crate::ast::class::{
    Class, ExternBinding, ExternClass, ExternField, ExternMethod, Field, Method, Param,
    Qualifiers, TypeParam, Visibility,
};
use crate::ast::decl::{Decl, Enum, EnumMember, Function, Import, Interface, InterfaceMember, TypeAlias, Variable};
use crate::ast::types::{Primitive, Type};
use crate::token::{Keyword, TokenKind};

/// Keywords that may start a new top-level item, used both by the
/// top-level dispatcher and by `synchronize` to find a safe recovery point.
pub(crate) fn starts_top_level_item(k: Keyword) -> bool {
    matches!(
        k,
        Keyword::Function
            | Keyword::Async
            | Keyword::Class
            | Keyword::Extern
            | Keyword::Enum
            | Keyword::Interface
            | Keyword::Type
            | Keyword::Let
            | Keyword::Const
            | Keyword::Import
    )
}

pub(crate) fn starts_local_decl(k: &TokenKind) -> bool {
    matches!(
        k,
        TokenKind::Keyword(Keyword::Let) | TokenKind::Keyword(Keyword::Const)
    )
}

impl Parser {
    pub(crate) fn parse_top_level_item(&mut self) -> Result<crate::ast::Item, ParseError> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Import) => {
                Ok(crate::ast::Item::Decl(Decl::Import(self.parse_import()?)))
            }
            _ => {
                let decl = self.parse_decl()?;
                self.matches(&TokenKind::Semicolon);
                Ok(crate::ast::Item::Decl(decl))
            }
        }
    }

    pub(crate) fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Keyword(Keyword::Function) | TokenKind::Keyword(Keyword::Async) => {
                Ok(Decl::Function(self.parse_function()?))
            }
            TokenKind::Keyword(Keyword::Extern) => Ok(Decl::ExternClass(self.parse_extern_class()?)),
            TokenKind::Keyword(Keyword::Class) => Ok(Decl::Class(self.parse_class()?)),
            TokenKind::Keyword(Keyword::Enum) => Ok(Decl::Enum(self.parse_enum()?)),
            TokenKind::Keyword(Keyword::Interface) => Ok(Decl::Interface(self.parse_interface()?)),
            TokenKind::Keyword(Keyword::Type) => Ok(Decl::TypeAlias(self.parse_type_alias()?)),
            TokenKind::Keyword(Keyword::Let) | TokenKind::Keyword(Keyword::Const) => {
                Ok(Decl::Variable(self.parse_variable()?))
            }
            TokenKind::Keyword(Keyword::Import) => Ok(Decl::Import(self.parse_import()?)),
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        let start = self.advance().span; // 'import'
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut names = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        names.push(n);
                    }
                    _ => return Err(self.unexpected("import name")),
                }
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        self.expect(TokenKind::Keyword(Keyword::From), "'from'")?;
        let from = match self.peek_kind().clone() {
            TokenKind::StringLiteral(s) => {
                self.advance();
                s
            }
            _ => return Err(self.unexpected("module path string")),
        };
        let end_span = self.peek().map(|t| t.span.clone()).unwrap_or_else(|| start.clone());
        self.matches(&TokenKind::Semicolon);
        let id = self.ids.next();
        Ok(Import {
            id,
            names,
            from,
            span: start.merge(&end_span),
        })
    }

    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        if !self.matches(&TokenKind::Lt) {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        loop {
            match self.peek_kind().clone() {
                TokenKind::Identifier(n) => {
                    self.advance();
                    params.push(TypeParam { name: n });
                }
                _ => return Err(self.unexpected("type parameter")),
            }
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt, "'>'")?;
        Ok(params)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
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
                self.expect(TokenKind::Colon, "':'")?;
                let ty = self.parse_type()?;
                params.push(Param { name, ty });
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(params)
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        let is_async = self.matches(&TokenKind::Keyword(Keyword::Async));
        let start = self.expect(TokenKind::Keyword(Keyword::Function), "'function'")?.span;
        let name = match self.peek_kind().clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.unexpected("function name")),
        };
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let ret = if self.matches(&TokenKind::Colon) {
            self.parse_type()?
        } else {
            Type::void()
        };
        let body = self.parse_block_stmt()?;
        let end = body.span.clone();
        let id = self.ids.next();
        Ok(Function {
            id,
            name,
            type_params,
            params,
            ret,
            body,
            is_async,
            span: start.merge(&end),
        })
    }

    /// `extern class Foo from "header.h" { ... }` or
    /// `extern class Foo from { cpp: "...", js: "...", bytecode: "..." } { ... }`
    fn parse_extern_class(&mut self) -> Result<ExternClass, ParseError> {
        let start = self.advance().span; // 'extern'
        self.expect(TokenKind::Keyword(Keyword::Class), "'class'")?;
        let name = match self.peek_kind().clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.unexpected("class name")),
        };
        self.expect(TokenKind::Keyword(Keyword::From), "'from'")?;
        let binding = self.parse_extern_binding()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let is_static = self.matches(&TokenKind::Keyword(Keyword::Static));
            if self.matches(&TokenKind::Keyword(Keyword::Function)) {
                let name = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("method name")),
                };
                let params = self.parse_params()?;
                let ret = if self.matches(&TokenKind::Colon) {
                    self.parse_type()?
                } else {
                    Type::void()
                };
                self.matches(&TokenKind::Semicolon);
                methods.push(ExternMethod {
                    name,
                    params,
                    ret,
                    is_static,
                });
            } else {
                let name = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("field name")),
                };
                self.expect(TokenKind::Colon, "':'")?;
                let ty = self.parse_type()?;
                self.matches(&TokenKind::Semicolon);
                fields.push(ExternField { name, ty, is_static });
            }
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        let id = self.ids.next();
        Ok(ExternClass {
            id,
            name,
            binding,
            fields,
            methods,
            span: start.merge(&end),
        })
    }

    fn parse_extern_binding(&mut self) -> Result<ExternBinding, ParseError> {
        if let TokenKind::StringLiteral(s) = self.peek_kind().clone() {
            self.advance();
            return Ok(ExternBinding {
                cpp: Some(s),
                js: None,
                bytecode: None,
            });
        }
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut binding = ExternBinding::default();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("binding key")),
                };
                self.expect(TokenKind::Colon, "':'")?;
                let value = match self.peek_kind().clone() {
                    TokenKind::StringLiteral(s) => {
                        self.advance();
                        s
                    }
                    _ => return Err(self.unexpected("binding path string")),
                };
                match key.as_str() {
                    "cpp" => binding.cpp = Some(value),
                    "js" => binding.js = Some(value),
                    "bytecode" => binding.bytecode = Some(value),
                    _ => {}
                }
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(binding)
    }

    fn parse_class(&mut self) -> Result<Class, ParseError> {
        let start = self.advance().span; // 'class'
        let name = match self.peek_kind().clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.unexpected("class name")),
        };
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let visibility = if self.matches(&TokenKind::Keyword(Keyword::Private)) {
                Visibility::Private
            } else {
                self.matches(&TokenKind::Keyword(Keyword::Public));
                Visibility::Public
            };
            let mut qualifiers = Qualifiers::default();
            loop {
                if self.matches(&TokenKind::Keyword(Keyword::Const)) {
                    qualifiers.is_const = true;
                } else if self.matches(&TokenKind::Keyword(Keyword::Readonly)) {
                    qualifiers.is_readonly = true;
                } else if self.matches(&TokenKind::Keyword(Keyword::Static)) {
                    qualifiers.is_static = true;
                } else {
                    break;
                }
            }
            let is_async = self.matches(&TokenKind::Keyword(Keyword::Async));
            if self.matches(&TokenKind::Keyword(Keyword::Function)) {
                let name = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("method name")),
                };
                let method_start = self.tokens_span_before();
                let params = self.parse_params()?;
                let ret = if self.matches(&TokenKind::Colon) {
                    self.parse_type()?
                } else {
                    Type::void()
                };
                let body = self.parse_block_stmt()?;
                let end = body.span.clone();
                let id = self.ids.next();
                methods.push(Method {
                    id,
                    name,
                    params,
                    ret,
                    body,
                    is_static: qualifiers.is_static,
                    visibility,
                    is_async,
                    span: method_start.merge(&end),
                });
            } else {
                let (name, is_quoted_name) = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        (n, false)
                    }
                    TokenKind::StringLiteral(n) => {
                        self.advance();
                        (n, true)
                    }
                    _ => return Err(self.unexpected("field name")),
                };
                let field_start = self.tokens_span_before();
                self.expect(TokenKind::Colon, "':'")?;
                let ty = self.parse_type()?;
                let default = if self.matches(&TokenKind::Assign) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                let end = default
                    .as_ref()
                    .map(|e| e.span.clone())
                    .unwrap_or_else(|| field_start.clone());
                self.matches(&TokenKind::Semicolon);
                let id = self.ids.next();
                fields.push(Field {
                    id,
                    name,
                    is_quoted_name,
                    ty,
                    visibility,
                    qualifiers,
                    default,
                    span: field_start.merge(&end),
                });
            }
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        let id = self.ids.next();
        Ok(Class {
            id,
            name,
            type_params,
            fields,
            methods,
            span: start.merge(&end),
        })
    }

    /// Span of the token just consumed, used as a declaration's start point
    /// after already having stepped past visibility/qualifier keywords.
    fn tokens_span_before(&self) -> crate::span::Span {
        self.peek().map(|t| t.span.clone()).unwrap_or_else(|| {
            crate::span::Span::synthetic(std::rc::Rc::from(""))
        })
    }

    fn parse_enum(&mut self) -> Result<Enum, ParseError> {
        let start = self.advance().span; // 'enum'
        let name = match self.peek_kind().clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.unexpected("enum name")),
        };
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut members = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let name = match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("enum member")),
                };
                let value = if self.matches(&TokenKind::Assign) {
                    match self.peek_kind().clone() {
                        TokenKind::IntLiteral(v) => {
                            self.advance();
                            Some(v)
                        }
                        _ => return Err(self.unexpected("integer literal")),
                    }
                } else {
                    None
                };
                members.push(EnumMember { name, value });
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        let id = self.ids.next();
        Ok(Enum {
            id,
            name,
            members,
            span: start.merge(&end),
        })
    }

    fn parse_interface(&mut self) -> Result<Interface, ParseError> {
        let start = self.advance().span; // 'interface'
        let name = match self.peek_kind().clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.unexpected("interface name")),
        };
        let mut extends = Vec::new();
        if self.matches(&TokenKind::Keyword(Keyword::Extends)) {
            loop {
                match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        extends.push(n);
                    }
                    _ => return Err(self.unexpected("base interface name")),
                }
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let is_readonly = self.matches(&TokenKind::Keyword(Keyword::Readonly));
            let name = match self.peek_kind().clone() {
                TokenKind::Identifier(n) => {
                    self.advance();
                    n
                }
                _ => return Err(self.unexpected("member name")),
            };
            let is_method = self.check(&TokenKind::LParen);
            let (ty, optional) = if is_method {
                let params = self.parse_params()?;
                let ret = if self.matches(&TokenKind::Colon) {
                    self.parse_type()?
                } else {
                    Type::void()
                };
                (
                    Type::Function {
                        params: params.into_iter().map(|p| p.ty).collect(),
                        ret: Box::new(ret),
                    },
                    false,
                )
            } else {
                let optional = self.matches(&TokenKind::Question);
                self.expect(TokenKind::Colon, "':'")?;
                (self.parse_type()?, optional)
            };
            self.matches(&TokenKind::Semicolon);
            members.push(InterfaceMember {
                name,
                ty,
                optional,
                is_readonly,
                is_method,
            });
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        let id = self.ids.next();
        Ok(Interface {
            id,
            name,
            extends,
            members,
            span: start.merge(&end),
        })
    }

    fn parse_type_alias(&mut self) -> Result<TypeAlias, ParseError> {
        let start = self.advance().span; // 'type'
        let name = match self.peek_kind().clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.unexpected("type alias name")),
        };
        self.expect(TokenKind::Assign, "'='")?;
        let ty = self.parse_type()?;
        let end_span = self.peek().map(|t| t.span.clone()).unwrap_or_else(|| start.clone());
        self.matches(&TokenKind::Semicolon);
        let id = self.ids.next();
        Ok(TypeAlias {
            id,
            name,
            ty,
            span: start.merge(&end_span),
        })
    }

    fn parse_variable(&mut self) -> Result<Variable, ParseError> {
        let is_const = matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Const));
        let start = self.advance().span; // 'let' / 'const'
        let name = match self.peek_kind().clone() {
            TokenKind::Identifier(n) => {
                self.advance();
                n
            }
            _ => return Err(self.unexpected("variable name")),
        };
        let annotation = if self.matches(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let initializer = if self.matches(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = initializer
            .as_ref()
            .map(|e| e.span.clone())
            .or_else(|| annotation.is_some().then(|| start.clone()))
            .unwrap_or_else(|| start.clone());
        let id = self.ids.next();
        Ok(Variable {
            id,
            name,
            is_const,
            annotation,
            initializer,
            span: start.merge(&end),
        })
    }

    /// Type-annotation grammar (§3): primitives, `T[]`, `Map<K,V>`, `Set<T>`,
    /// class/generic instantiations, `weak T`, unions (`A | B`) and the
    /// postfix `T?` optional-type sugar.
    pub(crate) fn parse_type(&mut self) -> Result<Type, ParseError> {
        let first = self.parse_type_atom()?;
        let mut members = vec![first];
        while self.matches(&TokenKind::Pipe) {
            members.push(self.parse_type_atom()?);
        }
        let ty = if members.len() == 1 {
            members.into_iter().next().unwrap()
        } else {
            crate::ast::types::make_union(members)
        };
        Ok(self.parse_type_postfix(ty))
    }

    fn parse_type_postfix(&mut self, ty: Type) -> Type {
        let mut ty = ty;
        while self.matches(&TokenKind::Question) {
            ty = Type::optional(ty);
        }
        while self.matches(&TokenKind::LBracket) {
            // arrays are written `T[]`; the closing bracket must follow
            // immediately with nothing in between.
            let _ = self.expect(TokenKind::RBracket, "']'");
            ty = Type::Array(Box::new(ty));
        }
        ty
    }

    fn parse_type_atom(&mut self) -> Result<Type, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Keyword(Keyword::Int) => {
                self.advance();
                Ok(Type::Primitive(Primitive::Int))
            }
            TokenKind::Keyword(Keyword::Float) => {
                self.advance();
                Ok(Type::Primitive(Primitive::Float))
            }
            TokenKind::Keyword(Keyword::Double) => {
                self.advance();
                Ok(Type::Primitive(Primitive::Double))
            }
            TokenKind::Keyword(Keyword::Char) => {
                self.advance();
                Ok(Type::Primitive(Primitive::Char))
            }
            TokenKind::Keyword(Keyword::Bool) => {
                self.advance();
                Ok(Type::Primitive(Primitive::Bool))
            }
            TokenKind::Keyword(Keyword::StringType) => {
                self.advance();
                Ok(Type::Primitive(Primitive::String))
            }
            TokenKind::Keyword(Keyword::Void) => {
                self.advance();
                Ok(Type::Primitive(Primitive::Void))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Type::Null)
            }
            TokenKind::Keyword(Keyword::Weak) => {
                self.advance();
                match self.peek_kind().clone() {
                    TokenKind::Identifier(n) => {
                        self.advance();
                        Ok(Type::Weak(n))
                    }
                    _ => Err(self.unexpected("class name")),
                }
            }
            TokenKind::Identifier(n) => {
                self.advance();
                match n.as_str() {
                    "Map" => {
                        self.expect(TokenKind::Lt, "'<'")?;
                        let k = self.parse_type()?;
                        self.expect(TokenKind::Comma, "','")?;
                        let v = self.parse_type()?;
                        self.expect(TokenKind::Gt, "'>'")?;
                        Ok(Type::Map(Box::new(k), Box::new(v)))
                    }
                    "Set" => {
                        self.expect(TokenKind::Lt, "'<'")?;
                        let e = self.parse_type()?;
                        self.expect(TokenKind::Gt, "'>'")?;
                        Ok(Type::Set(Box::new(e)))
                    }
                    _ => {
                        if self.check(&TokenKind::Lt) {
                            let args = self.parse_class_type_args()?;
                            Ok(Type::Class {
                                name: n,
                                args: Some(args),
                            })
                        } else {
                            Ok(Type::Class { name: n, args: None })
                        }
                    }
                }
            }
            _ => Err(self.unexpected("type")),
        }
    }

    fn parse_class_type_args(&mut self) -> Result<Vec<Type>, ParseError> {
        self.expect(TokenKind::Lt, "'<'")?;
        let mut args = vec![self.parse_type()?];
        while self.matches(&TokenKind::Comma) {
            args.push(self.parse_type()?);
        }
        self.expect(TokenKind::Gt, "'>'")?;
        Ok(args)
    }

}
