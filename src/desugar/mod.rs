//! Phase 4: Desugarer — structural interfaces to tagged unions, closed-world
//! only (§4.3).
//!
//! For each `interface I`, every declared class in the compilation set is
//! checked for structural satisfaction. Satisfying classes become the
//! members of a generated `type I = C1 | C2 | …` alias, in declaration
//! order; `I` itself is removed from the item list. A single match
//! collapses to the class type directly rather than a one-member union.
//!
//! Open-world mode (`closed_world == false`) is a no-op: interfaces are
//! left as nominal declarations for downstream code paths not specified
//! here (§4.3 "Open-world mode").

use crate::ast::class::Class;
use crate::ast::decl::{Decl, Interface, InterfaceMember, TypeAlias};
use crate::ast::ids::NodeIdGen;
use crate::ast::types::{types_equal, Type};
use crate::ast::{Item, Program};
use crate::validator::diagnostics::Diagnostic;
use std::collections::HashMap;

/// Desugars every satisfied interface in `program` into a union type alias.
/// Returns one diagnostic per interface with no satisfying class (§4.3
/// "Failure"); those interfaces are left in the item list untouched.
pub fn desugar_interfaces(program: &mut Program, closed_world: bool, ids: &NodeIdGen) -> Vec<Diagnostic> {
    let span = tracing::debug_span!("desugar", closed_world);
    let _enter = span.enter();

    if !closed_world {
        tracing::debug!("open-world mode, skipping interface desugaring");
        return Vec::new();
    }

    let interfaces: HashMap<String, Interface> = program
        .items
        .iter()
        .filter_map(|i| match i {
            Item::Decl(Decl::Interface(iface)) => Some((iface.name.clone(), iface.clone())),
            _ => None,
        })
        .collect();
    let classes: Vec<Class> = program
        .items
        .iter()
        .filter_map(|i| match i {
            Item::Decl(Decl::Class(c)) => Some(c.clone()),
            _ => None,
        })
        .collect();

    let mut diagnostics = Vec::new();
    let mut replacements: HashMap<String, Decl> = HashMap::new();
    let mut unresolved: Vec<String> = Vec::new();

    for iface in interfaces.values() {
        let members = match resolve_members(iface, &interfaces) {
            Some(m) => m,
            None => {
                diagnostics.push(Diagnostic::error(
                    &iface.span,
                    format!("interface '{}' extends an undeclared interface", iface.name),
                ));
                unresolved.push(iface.name.clone());
                continue;
            }
        };
        let matching: Vec<&Class> = classes.iter().filter(|c| class_satisfies(c, &members)).collect();
        if matching.is_empty() {
            diagnostics.push(Diagnostic::error(
                &iface.span,
                format!("interface '{}' is satisfied by no declared class", iface.name),
            ));
            continue;
        }
        let member_types: Vec<Type> = matching
            .iter()
            .map(|c| Type::Class {
                name: c.name.clone(),
                args: None,
            })
            .collect();
        let ty = if member_types.len() == 1 {
            member_types.into_iter().next().unwrap()
        } else {
            Type::Union(member_types)
        };
        replacements.insert(
            iface.name.clone(),
            Decl::TypeAlias(TypeAlias {
                id: ids.next(),
                name: iface.name.clone(),
                ty,
                span: iface.span.clone(),
            }),
        );
    }

    let replacements_count = replacements.len();
    program.items = program
        .items
        .drain(..)
        .filter_map(|item| match item {
            Item::Decl(Decl::Interface(iface)) => match replacements.remove(&iface.name) {
                Some(replacement) => Some(Item::Decl(replacement)),
                None => Some(Item::Decl(Decl::Interface(iface))),
            },
            other => Some(other),
        })
        .collect();

    tracing::debug!(
        interfaces_replaced = replacements_count,
        errors = diagnostics.len(),
        "interface desugaring complete"
    );
    diagnostics
}

/// Collects an interface's own members plus every member inherited
/// transitively via `extends`. Returns `None` if any named parent is
/// undeclared.
fn resolve_members(iface: &Interface, all: &HashMap<String, Interface>) -> Option<Vec<InterfaceMember>> {
    let mut members = iface.members.clone();
    let mut seen = std::collections::HashSet::new();
    seen.insert(iface.name.clone());
    let mut frontier = iface.extends.clone();
    while let Some(parent_name) = frontier.pop() {
        if !seen.insert(parent_name.clone()) {
            continue;
        }
        let parent = all.get(&parent_name)?;
        members.extend(parent.members.iter().cloned());
        frontier.extend(parent.extends.iter().cloned());
    }
    Some(members)
}

/// A class satisfies an interface when, for every required member, the
/// class declares a member of the same name and invariant type (and, for
/// fields the interface marks `readonly`, a matching `readonly` field).
/// Method members additionally require exact arity and return-type match.
/// Extra members on the class are always permitted; `optional` interface
/// members may be absent (§4.3).
fn class_satisfies(class: &Class, members: &[InterfaceMember]) -> bool {
    members.iter().all(|member| {
        if member.is_method {
            match class.methods.iter().find(|m| m.name == member.name) {
                Some(method) => {
                    let method_ty = Type::Function {
                        params: method.params.iter().map(|p| p.ty.clone()).collect(),
                        ret: Box::new(method.ret.clone()),
                    };
                    types_equal(&method_ty, &member.ty)
                }
                None => member.optional,
            }
        } else {
            match class.fields.iter().find(|f| f.name == member.name) {
                Some(field) => {
                    types_equal(&field.ty, &member.ty)
                        && (!member.is_readonly || field.qualifiers.is_readonly)
                }
                None => member.optional,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    fn parse_src(src: &str) -> Program {
        let tokens = Lexer::new(src, "t.tx").tokenize();
        let result = parse(tokens);
        assert!(result.errors.is_empty(), "parse errors: {:?}", result.errors);
        result.program
    }

    #[test]
    fn satisfied_interface_becomes_union_of_satisfying_classes() {
        let mut program = parse_src(
            r#"
            interface Drivable { drive(): void; }
            class Car { drive(): void {} }
            class Truck { drive(): void {} }
            class Bicycle { pedal(): void {} }
            "#,
        );
        let diagnostics = desugar_interfaces(&mut program, true, &NodeIdGen::new());
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let alias = program.items.iter().find_map(|i| match i {
            Item::Decl(Decl::TypeAlias(t)) if t.name == "Drivable" => Some(t),
            _ => None,
        });
        let alias = alias.expect("Drivable should desugar to a type alias");
        match &alias.ty {
            Type::Union(members) => {
                let names: Vec<&str> = members
                    .iter()
                    .map(|m| match m {
                        Type::Class { name, .. } => name.as_str(),
                        _ => panic!("expected class member"),
                    })
                    .collect();
                assert_eq!(names, vec!["Car", "Truck"]);
            }
            other => panic!("expected a union, found {other}"),
        }
        assert!(!program
            .items
            .iter()
            .any(|i| matches!(i, Item::Decl(Decl::Interface(_)))));
    }

    #[test]
    fn unsatisfied_interface_is_reported_and_left_in_place() {
        let mut program = parse_src("interface Flyable { fly(): void; }\nclass Rock { mass: int = 1; }\n");
        let diagnostics = desugar_interfaces(&mut program, true, &NodeIdGen::new());
        assert_eq!(diagnostics.len(), 1);
        assert!(program
            .items
            .iter()
            .any(|i| matches!(i, Item::Decl(Decl::Interface(_)))));
    }

    #[test]
    fn open_world_mode_skips_desugaring_entirely() {
        let mut program = parse_src("interface Drivable { drive(): void; }\nclass Car { drive(): void {} }\n");
        let diagnostics = desugar_interfaces(&mut program, false, &NodeIdGen::new());
        assert!(diagnostics.is_empty());
        assert!(program
            .items
            .iter()
            .any(|i| matches!(i, Item::Decl(Decl::Interface(_)))));
    }
}
