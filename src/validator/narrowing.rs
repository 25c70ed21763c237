//! Narrowing-guard recognition (§4.4).
//!
//! Recognizes the two guard shapes the validator narrows on:
//! `x.kind == "Tag"` against a discriminant field, and `x is T` against a
//! union member. Recording the refined type into the scope stack's
//! narrowing map is done by the caller in `validator/mod.rs`; this module
//! only recognizes the shape and says what the refinement would be.

use crate::ast::expr::{BinaryOp, Expr, ExprKind, Literal};
use crate::ast::types::Type;
use std::collections::HashMap;

/// Resolves an identifier to its currently-declared type, so a guard over
/// it can be matched against `discriminants`. The validator supplies this
/// via `ScopeStack::resolve` — kept as a trait object rather than a concrete
/// dependency so this module stays free of the scope-stack type.
pub type TypeResolver<'a> = dyn Fn(&str) -> Option<Type> + 'a;

/// What a recognized guard narrows and to what, on both branches.
pub struct Narrowing {
    /// Name of the narrowed identifier (e.g. `x` in `x.kind == "Adult"`).
    pub subject: String,
    pub then_type: Type,
    /// `None` when the else-branch exclusion can't be expressed as a
    /// single type (e.g. excluding one member of a 3-way union).
    pub else_type: Option<Type>,
}

/// Recognizes `x.kind == "Tag"` where `discriminants` maps a union's
/// discriminant values to their member class type (§4.5), or `null`
/// equality against a nullable identifier, or `x is T`.
pub fn recognize_guard(
    cond: &Expr,
    resolve: &TypeResolver,
    discriminants: &HashMap<(String, String), Type>,
) -> Option<Narrowing> {
    match &cond.kind {
        ExprKind::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } => {
            if let ExprKind::Member { object, name: _ } = &left.kind {
                if let ExprKind::Identifier(subject) = &object.kind {
                    if let ExprKind::Literal(Literal::Str(tag)) = &right.kind {
                        let union_ty = resolve(subject)?;
                        let key = (union_type_key(&union_ty), tag.clone());
                        if let Some(member_ty) = discriminants.get(&key) {
                            return Some(Narrowing {
                                subject: subject.clone(),
                                then_type: member_ty.clone(),
                                else_type: None,
                            });
                        }
                    }
                }
            }
            if let ExprKind::Identifier(subject) = &left.kind {
                if matches!(right.kind, ExprKind::Literal(Literal::Null)) {
                    let union_ty = resolve(subject)?;
                    return Some(Narrowing {
                        subject: subject.clone(),
                        then_type: Type::Null,
                        else_type: Some(union_ty.non_null()),
                    });
                }
            }
            None
        }
        ExprKind::IsType { value, ty } => {
            if let ExprKind::Identifier(subject) = &value.kind {
                Some(Narrowing {
                    subject: subject.clone(),
                    then_type: ty.clone(),
                    else_type: None,
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

fn union_type_key(ty: &Type) -> String {
    ty.to_string()
}
