//! Expression nodes (§3).
//!
//! Every expression carries a `NodeId` (for the narrowing/scope-tracker hint
//! maps, see `ids.rs`) and an `inferred_type` slot the validator fills in.
//! Until validation runs the slot is `None`; after validation it is always
//! `Some` (possibly `Type::Unknown`, which marks a suppressed error
//! cascade — §4.4, §7).

use super::ids::NodeId;
use super::types::Type;
use crate::span::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    /// Fractional literal text as written; the validator decides
    /// `float`/`double` from context (§4.4).
    Fractional(String),
    Char(char),
    Str(String),
    Bool(bool),
    Null,
}

/// One chunk of a (possibly tagged) template string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    Text(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectField {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(String),
    /// `obj.name`, or `obj."quoted-name"` for a quoted field access.
    Member {
        object: Box<Expr>,
        name: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        type_args: Option<Vec<Type>>,
    },
    /// Object-literal construction, `Point { x: 1, y: 2 }`. The target
    /// class name is `None` until context (the enclosing annotation or
    /// declared type) resolves it — a free-standing literal without class
    /// context is a validation error (§4.4).
    ObjectLiteral {
        class_name: Option<String>,
        fields: Vec<ObjectField>,
    },
    ArrayLiteral(Vec<Expr>),
    MapLiteral(Vec<(Expr, Expr)>),
    SetLiteral(Vec<Expr>),
    /// `.Member` enum shorthand; the enum is resolved from context.
    EnumShorthand(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `a..b` (inclusive) / `a..<b` (exclusive) — `inclusive` distinguishes.
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        inclusive: bool,
    },
    Template {
        tag: Option<String>,
        parts: Vec<TemplatePart>,
    },
    Lambda {
        params: Vec<(String, Option<Type>)>,
        ret: Option<Type>,
        body: Box<super::stmt::Stmt>,
    },
    /// `async f(args)` — schedules a call, evaluates to a task handle.
    Async(Box<Expr>),
    Await(Box<Expr>),
    /// `x is T`
    IsType {
        value: Box<Expr>,
        ty: Type,
    },
    Cast {
        value: Box<Expr>,
        ty: Type,
    },
    New {
        class_name: String,
        args: Vec<Expr>,
        type_args: Option<Vec<Type>>,
    },
    Coalesce {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `target = value`. `target` is restricted by the parser to an
    /// identifier, member or index expression; the validator checks
    /// const/readonly/private rules against whichever it resolves to.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    This,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
    pub inferred_type: Option<Type>,
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind, span: Span) -> Self {
        Expr {
            id,
            kind,
            span,
            inferred_type: None,
        }
    }
}
