//! Static types (§3): a tagged variant over primitives, containers, classes,
//! enums, unions, functions and the two escape hatches `Unknown` and
//! `Generic`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    Int,
    Float,
    Double,
    Char,
    Bool,
    String,
    Void,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Char => "char",
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::Void => "void",
        };
        write!(f, "{s}")
    }
}

/// Types admissible as map keys / set elements (§3 Type invariants).
pub fn is_admissible_key_type(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Primitive(Primitive::Int)
            | Type::Primitive(Primitive::String)
            | Type::Primitive(Primitive::Bool)
            | Type::Primitive(Primitive::Char)
            | Type::Enum(_)
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Primitive(Primitive),
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Set(Box<Type>),
    /// `args` is `None` for a non-generic class, `Some(vec![])` is not a
    /// valid state (use `None`) and `Some(ts)` for an instantiated generic.
    Class {
        name: String,
        args: Option<Vec<Type>>,
    },
    Enum(String),
    /// Deduplicated; `null` is represented as `Type::Null` and may appear as
    /// a member.
    Union(Vec<Type>),
    Optional(Box<Type>),
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },
    Generic(String),
    Weak(String),
    Null,
    Unknown,
}

impl Type {
    pub fn int() -> Type {
        Type::Primitive(Primitive::Int)
    }
    pub fn double() -> Type {
        Type::Primitive(Primitive::Double)
    }
    pub fn float() -> Type {
        Type::Primitive(Primitive::Float)
    }
    pub fn string() -> Type {
        Type::Primitive(Primitive::String)
    }
    pub fn bool() -> Type {
        Type::Primitive(Primitive::Bool)
    }
    pub fn char() -> Type {
        Type::Primitive(Primitive::Char)
    }
    pub fn void() -> Type {
        Type::Primitive(Primitive::Void)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Primitive(Primitive::Int)
                | Type::Primitive(Primitive::Float)
                | Type::Primitive(Primitive::Double)
        )
    }

    /// `Union{inner, null}` is printed and reasoned about as `Optional`;
    /// this builds the canonical two-member union.
    pub fn optional(inner: Type) -> Type {
        Type::Optional(Box::new(inner))
    }

    /// True when `null` is among this type's possible values, directly or
    /// via `Optional`. `Weak` is always included: a weak reference can
    /// observe its referent collected out from under it (§4.4).
    pub fn accepts_null(&self) -> bool {
        match self {
            Type::Null | Type::Optional(_) | Type::Unknown | Type::Weak(_) => true,
            Type::Union(members) => members.iter().any(|m| matches!(m, Type::Null)),
            _ => false,
        }
    }

    /// Strips one layer of `Optional`/`null`-union, used when narrowing a
    /// nullable type after a guard. A `weak T` field narrows to a plain
    /// `T` reference once null-checked, since the weakness is exactly the
    /// "might have been collected, check before use" property the guard
    /// rules out (§4.4 "Weak references").
    pub fn non_null(&self) -> Type {
        match self {
            Type::Optional(inner) => (**inner).clone(),
            Type::Weak(class) => Type::Class {
                name: class.clone(),
                args: None,
            },
            Type::Union(members) => {
                let rest: Vec<Type> = members
                    .iter()
                    .filter(|m| !matches!(m, Type::Null))
                    .cloned()
                    .collect();
                match rest.len() {
                    0 => Type::Unknown,
                    1 => rest.into_iter().next().unwrap(),
                    _ => Type::Union(rest),
                }
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{p}"),
            Type::Array(e) => write!(f, "{e}[]"),
            Type::Map(k, v) => write!(f, "Map<{k}, {v}>"),
            Type::Set(e) => write!(f, "Set<{e}>"),
            Type::Class { name, args: None } => write!(f, "{name}"),
            Type::Class {
                name,
                args: Some(args),
            } => {
                write!(f, "{name}<")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ">")
            }
            Type::Enum(name) => write!(f, "{name}"),
            Type::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            Type::Optional(inner) => write!(f, "{inner}|null"),
            Type::Function { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Generic(name) => write!(f, "{name}"),
            Type::Weak(class) => write!(f, "weak {class}"),
            Type::Null => write!(f, "null"),
            Type::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Deduplicates union members, flattening nested unions and collapsing a
/// single-member union down to that member (the rule desugaring also relies
/// on — see `desugar.rs`).
pub fn make_union(mut members: Vec<Type>) -> Type {
    let mut flat = Vec::new();
    fn flatten(ty: Type, out: &mut Vec<Type>) {
        match ty {
            Type::Union(ms) => {
                for m in ms {
                    flatten(m, out);
                }
            }
            other => out.push(other),
        }
    }
    for m in members.drain(..) {
        flatten(m, &mut flat);
    }
    let mut deduped: Vec<Type> = Vec::new();
    for m in flat {
        if !deduped.iter().any(|d| types_equal(d, &m)) {
            deduped.push(m);
        }
    }
    if deduped.len() == 1 {
        deduped.into_iter().next().unwrap()
    } else {
        Type::Union(deduped)
    }
}

/// Structural type equality (used by assignability and by the interface
/// desugarer, which requires invariant — not covariant — member types).
pub fn types_equal(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Primitive(x), Type::Primitive(y)) => x == y,
        (Type::Array(x), Type::Array(y)) => types_equal(x, y),
        (Type::Map(k1, v1), Type::Map(k2, v2)) => types_equal(k1, k2) && types_equal(v1, v2),
        (Type::Set(x), Type::Set(y)) => types_equal(x, y),
        (
            Type::Class {
                name: n1,
                args: a1,
            },
            Type::Class {
                name: n2,
                args: a2,
            },
        ) => {
            n1 == n2
                && match (a1, a2) {
                    (None, None) => true,
                    (Some(x), Some(y)) => {
                        x.len() == y.len() && x.iter().zip(y).all(|(p, q)| types_equal(p, q))
                    }
                    _ => false,
                }
        }
        (Type::Enum(x), Type::Enum(y)) => x == y,
        (Type::Union(x), Type::Union(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|m| y.iter().any(|n| types_equal(m, n)))
        }
        (Type::Optional(x), Type::Optional(y)) => types_equal(x, y),
        (Type::Function { params: p1, ret: r1 }, Type::Function { params: p2, ret: r2 }) => {
            p1.len() == p2.len()
                && p1.iter().zip(p2).all(|(x, y)| types_equal(x, y))
                && types_equal(r1, r2)
        }
        (Type::Generic(x), Type::Generic(y)) => x == y,
        (Type::Weak(x), Type::Weak(y)) => x == y,
        (Type::Null, Type::Null) => true,
        (Type::Unknown, Type::Unknown) => true,
        // Optional<T> === Union{T, null}
        (Type::Optional(x), Type::Union(y)) | (Type::Union(y), Type::Optional(x)) => {
            y.len() == 2
                && y.iter().any(|m| matches!(m, Type::Null))
                && y.iter().any(|m| types_equal(m, x))
        }
        _ => false,
    }
}
