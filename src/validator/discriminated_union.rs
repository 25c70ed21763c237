//! Discriminated-union detection (§4.5).
//!
//! A union `type U = A | B | …` is discriminated when every member class
//! carries a `const` field of the same name with a distinct compile-time
//! constant value. Detecting this enables `x.kind == "Tag"` narrowing and
//! tells a backend how to tag-dispatch/deserialize.

use crate::ast::class::Class;
use crate::ast::expr::{ExprKind, Literal};
use crate::ast::types::Type;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum DiscriminantValue {
    Str(String),
    Int(i64),
}

/// A discriminated union's tag table: discriminant value -> member type.
pub struct DiscriminantMap {
    pub field_name: String,
    pub by_value: HashMap<String, Type>,
}

/// Attempts to build a discriminant map for a union whose members are all
/// named classes. Returns `None` if any member lacks a `const` field common
/// to all members, or if any two members share a discriminant value.
pub fn detect(members: &[String], classes: &HashMap<String, Class>) -> Option<DiscriminantMap> {
    if members.len() < 2 {
        return None;
    }
    let mut field_name: Option<String> = None;
    let mut by_value = HashMap::new();
    let mut seen = std::collections::HashSet::new();

    for member in members {
        let class = classes.get(member)?;
        let field = class.discriminant_field()?;
        match &field_name {
            None => field_name = Some(field.name.clone()),
            Some(existing) if existing == &field.name => {}
            Some(_) => return None,
        }
        let default = field.default.as_ref()?;
        let value = literal_tag(&default.kind)?;
        if !seen.insert(value.clone()) {
            return None; // duplicate discriminant value: not distinct
        }
        by_value.insert(
            value,
            Type::Class {
                name: member.clone(),
                args: None,
            },
        );
    }

    Some(DiscriminantMap {
        field_name: field_name?,
        by_value,
    })
}

fn literal_tag(kind: &ExprKind) -> Option<String> {
    match kind {
        ExprKind::Literal(Literal::Str(s)) => Some(s.clone()),
        ExprKind::Literal(Literal::Int(i)) => Some(i.to_string()),
        _ => None,
    }
}
