//! Class shape (§3): ordered fields and methods. Field order is observable
//! (object-literal positional construction, JSON serialization) so it is
//! always a `Vec`, never a map.

use super::expr::Expr;
use super::ids::NodeId;
use super::stmt::Stmt;
use super::types::Type;
use crate::span::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_readonly: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: NodeId,
    /// Preserved exactly for quoted names (`"my-field"`), accessed as
    /// `obj."my-field"` (§4.2).
    pub name: String,
    pub is_quoted_name: bool,
    pub ty: Type,
    pub visibility: Visibility,
    pub qualifiers: Qualifiers,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Stmt,
    pub is_static: bool,
    pub visibility: Visibility,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub span: Span,
}

impl Class {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// The const field used as a union discriminant, if this class
    /// declares exactly one const field with a literal string/int default
    /// (§4.5). Detection of *distinctness across a union* happens in the
    /// validator; this just identifies the candidate field on one class.
    pub fn discriminant_field(&self) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.qualifiers.is_const && !f.qualifiers.is_static)
    }
}

/// Binding referenced by an `extern class Foo from { cpp: "...", js: "..." }`
/// declaration, or the single-string `from "header.h"` form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExternBinding {
    pub cpp: Option<String>,
    pub js: Option<String>,
    pub bytecode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternField {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternClass {
    pub id: NodeId,
    pub name: String,
    pub binding: ExternBinding,
    pub fields: Vec<ExternField>,
    pub methods: Vec<ExternMethod>,
    pub span: Span,
}
