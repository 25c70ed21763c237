//! Statement nodes (§3), including `blank` — a first-class node that
//! preserves a standalone comment or blank-line run so formatting
//! round-trips through codegen (§9 "Trivia as statements").

use super::decl::Decl;
use super::expr::Expr;
use super::ids::NodeId;
use crate::span::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` represents `default:`.
    pub labels: Vec<CaseLabel>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseLabel {
    Value(Expr),
    Null,
    /// `case 0..5:` — an inclusive numeric range case.
    Range(i64, i64),
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForOfSource {
    Range { start: Expr, end: Expr, inclusive: bool },
    Collection(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        binding: String,
        is_const: bool,
        source: ForOfSource,
        body: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Expression(Expr),
    Declaration(Decl),
    /// A standalone comment and/or run of blank lines, preserved verbatim.
    Blank {
        comment: Option<String>,
        blank_lines: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(id: NodeId, kind: StmtKind, span: Span) -> Self {
        Stmt { id, kind, span }
    }
}
