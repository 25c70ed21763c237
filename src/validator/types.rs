//! Assignability, numeric widening, string-plus coercion and reverse
//! inference (§4.4).

use crate::ast::types::{types_equal, Primitive, Type};

/// `int <: float <: double`; used both for widening checks and to decide
/// the rank used when two numeric operands meet at a binary operator.
fn numeric_rank(p: Primitive) -> Option<u8> {
    match p {
        Primitive::Int => Some(0),
        Primitive::Float => Some(1),
        Primitive::Double => Some(2),
        _ => None,
    }
}

/// Is `from` assignable to a slot of type `to`? Implements: `T <: T`;
/// `T <: T|U`; numeric widening `int <: float <: double`; `null <:
/// Optional<T>`/`U|null`; `Unknown` accepts anything and is accepted by
/// anything (error-cascade suppression, §7).
pub fn is_assignable(from: &Type, to: &Type) -> bool {
    if matches!(from, Type::Unknown) || matches!(to, Type::Unknown) {
        return true;
    }
    if types_equal(from, to) {
        return true;
    }
    if matches!(from, Type::Null) {
        return to.accepts_null();
    }
    if let (Type::Primitive(a), Type::Primitive(b)) = (from, to) {
        if let (Some(ra), Some(rb)) = (numeric_rank(*a), numeric_rank(*b)) {
            return ra <= rb;
        }
    }
    match to {
        Type::Union(members) => members.iter().any(|m| is_assignable(from, m)),
        Type::Optional(inner) => is_assignable(from, inner),
        _ => false,
    }
}

/// `+` is string concatenation when either operand is `string` (§4.4
/// "String-plus"). Coercion: numeric via decimal formatting, `bool` →
/// `"true"/"false"`, `char` → one-character string.
pub fn is_string_plus(lhs: &Type, rhs: &Type) -> bool {
    matches!(lhs, Type::Primitive(Primitive::String)) || matches!(rhs, Type::Primitive(Primitive::String))
}

/// Common supertype used for array-literal element typing: every element
/// must already agree, or all be numeric (widened to the highest rank).
pub fn common_supertype(tys: &[Type]) -> Option<Type> {
    let mut iter = tys.iter();
    let first = iter.next()?.clone();
    let mut acc = first;
    for t in iter {
        if types_equal(&acc, t) {
            continue;
        }
        if let (Type::Primitive(a), Type::Primitive(b)) = (&acc, t) {
            if let (Some(ra), Some(rb)) = (numeric_rank(*a), numeric_rank(*b)) {
                acc = if rb > ra { t.clone() } else { acc };
                continue;
            }
        }
        return None;
    }
    Some(acc)
}

/// No implicit conversion between `char` and `string` (§4.4).
pub fn is_char_string_mismatch(a: &Type, b: &Type) -> bool {
    matches!(
        (a, b),
        (Type::Primitive(Primitive::Char), Type::Primitive(Primitive::String))
            | (Type::Primitive(Primitive::String), Type::Primitive(Primitive::Char))
    )
}

/// A cast is redundant (and should be elided by a backend) when the target
/// type exactly equals the source type (§4.4).
pub fn is_redundant_cast(source: &Type, target: &Type) -> bool {
    types_equal(source, target)
}
