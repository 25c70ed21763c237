//! Top-level and block-scoped declaration nodes (§3).

use super::class::{Class, ExternClass, Param, TypeParam};
use super::expr::Expr;
use super::ids::NodeId;
use super::stmt::Stmt;
use super::types::Type;
use crate::span::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Stmt,
    pub is_async: bool,
    pub span: Span,
}

impl Function {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMember {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub is_readonly: bool,
    /// `true` for a method member (so arity/return-type must match exactly
    /// rather than only the field-style invariant-type rule — §4.3).
    pub is_method: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub id: NodeId,
    pub name: String,
    pub extends: Vec<String>,
    pub members: Vec<InterfaceMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    /// Explicit value if given; otherwise auto-numbered from the previous
    /// member starting at 0.
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub id: NodeId,
    pub name: String,
    pub members: Vec<EnumMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAlias {
    pub id: NodeId,
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: NodeId,
    pub name: String,
    pub is_const: bool,
    pub annotation: Option<Type>,
    pub initializer: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub id: NodeId,
    /// Named bindings imported (empty means "whole module", not exercised
    /// by the surface grammar spec.md describes but kept for forward
    /// compatibility with namespace imports).
    pub names: Vec<String>,
    pub from: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Function(Function),
    Class(Class),
    ExternClass(ExternClass),
    Enum(Enum),
    Interface(Interface),
    TypeAlias(TypeAlias),
    Variable(Variable),
    Import(Import),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Function(f) => &f.name,
            Decl::Class(c) => &c.name,
            Decl::ExternClass(c) => &c.name,
            Decl::Enum(e) => &e.name,
            Decl::Interface(i) => &i.name,
            Decl::TypeAlias(t) => &t.name,
            Decl::Variable(v) => &v.name,
            Decl::Import(_) => "",
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Decl::Function(f) => &f.span,
            Decl::Class(c) => &c.span,
            Decl::ExternClass(c) => &c.span,
            Decl::Enum(e) => &e.span,
            Decl::Interface(i) => &i.span,
            Decl::TypeAlias(t) => &t.span,
            Decl::Variable(v) => &v.span,
            Decl::Import(i) => &i.span,
        }
    }
}
