//! The Abstract Syntax Tree (§3).
//!
//! `Program` is an ordered list of top-level items — declarations and
//! (when `allowTopLevelStatements` is set, §6) bare statements — plus the
//! node-id generator every later stage shares so ids stay globally unique
//! across a whole compilation (monomorphized copies included).

pub mod class;
pub mod decl;
pub mod expr;
pub mod ids;
pub mod stmt;
pub mod types;

use decl::Decl;
use ids::NodeIdGen;
use stmt::Stmt;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Item {
    Decl(Decl),
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    pub fn new(items: Vec<Item>) -> Self {
        Program { items }
    }

    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.items.iter().filter_map(|i| match i {
            Item::Decl(d) => Some(d),
            Item::Stmt(_) => None,
        })
    }
}

/// Shared, process-wide-per-compilation id generator. Not part of
/// `Program` itself since a `Program` must stay plain-data (`Serialize`);
/// callers thread one generator through lexing→parsing of every file in a
/// compilation unit so ids never collide (§5: module loading is a
/// deterministic, single-threaded traversal).
pub type IdGen = NodeIdGen;
