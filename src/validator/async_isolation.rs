//! Async isolation static analysis (§4.4, §5).
//!
//! An `async` function may not read or write globals. Arguments passed to
//! an `async` call must be primitives, `string`, or deeply-immutable class
//! instances (every field `const`/`readonly`, transitively).

use crate::ast::class::Class;
use crate::ast::expr::{Expr, ExprKind};
use crate::ast::stmt::{Stmt, StmtKind};
use crate::ast::types::{Primitive, Type};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct IsolationViolation {
    pub identifier: String,
    pub reason: String,
}

/// Walks a function body looking for references to names in `globals` that
/// are not shadowed by a local/parameter declared along the way.
pub fn check_no_global_access(
    body: &Stmt,
    globals: &HashSet<String>,
    params: &HashSet<String>,
) -> Vec<IsolationViolation> {
    let mut locals = params.clone();
    let mut violations = Vec::new();
    walk_stmt(body, globals, &mut locals, &mut violations);
    violations
}

fn walk_stmt(
    stmt: &Stmt,
    globals: &HashSet<String>,
    locals: &mut HashSet<String>,
    out: &mut Vec<IsolationViolation>,
) {
    match &stmt.kind {
        StmtKind::Block(stmts) => {
            let snapshot = locals.clone();
            for s in stmts {
                walk_stmt(s, globals, locals, out);
            }
            *locals = snapshot;
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr(cond, globals, locals, out);
            walk_stmt(then_branch, globals, locals, out);
            if let Some(e) = else_branch {
                walk_stmt(e, globals, locals, out);
            }
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(i) = init {
                walk_stmt(i, globals, locals, out);
            }
            if let Some(c) = cond {
                walk_expr(c, globals, locals, out);
            }
            if let Some(s) = step {
                walk_expr(s, globals, locals, out);
            }
            walk_stmt(body, globals, locals, out);
        }
        StmtKind::ForOf {
            binding,
            source,
            body,
            ..
        } => {
            match source {
                crate::ast::stmt::ForOfSource::Range { start, end, .. } => {
                    walk_expr(start, globals, locals, out);
                    walk_expr(end, globals, locals, out);
                }
                crate::ast::stmt::ForOfSource::Collection(c) => walk_expr(c, globals, locals, out),
            }
            locals.insert(binding.clone());
            walk_stmt(body, globals, locals, out);
        }
        StmtKind::While { cond, body } => {
            walk_expr(cond, globals, locals, out);
            walk_stmt(body, globals, locals, out);
        }
        StmtKind::Switch { subject, cases } => {
            walk_expr(subject, globals, locals, out);
            for case in cases {
                for s in &case.body {
                    walk_stmt(s, globals, locals, out);
                }
            }
        }
        StmtKind::Return(Some(e)) => walk_expr(e, globals, locals, out),
        StmtKind::Expression(e) => walk_expr(e, globals, locals, out),
        StmtKind::Declaration(crate::ast::decl::Decl::Variable(v)) => {
            if let Some(init) = &v.initializer {
                walk_expr(init, globals, locals, out);
            }
            locals.insert(v.name.clone());
        }
        _ => {}
    }
}

fn walk_expr(
    expr: &Expr,
    globals: &HashSet<String>,
    locals: &HashSet<String>,
    out: &mut Vec<IsolationViolation>,
) {
    match &expr.kind {
        ExprKind::Identifier(name) => {
            if globals.contains(name) && !locals.contains(name) {
                out.push(IsolationViolation {
                    identifier: name.clone(),
                    reason: "cannot access global variables from an async function".to_string(),
                });
            }
        }
        ExprKind::Member { object, .. } => walk_expr(object, globals, locals, out),
        ExprKind::Index { object, index } => {
            walk_expr(object, globals, locals, out);
            walk_expr(index, globals, locals, out);
        }
        ExprKind::Call { callee, args, .. } => {
            walk_expr(callee, globals, locals, out);
            for a in args {
                walk_expr(a, globals, locals, out);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, globals, locals, out);
            walk_expr(right, globals, locals, out);
        }
        ExprKind::Unary { operand, .. } => walk_expr(operand, globals, locals, out),
        ExprKind::Range { start, end, .. } => {
            walk_expr(start, globals, locals, out);
            walk_expr(end, globals, locals, out);
        }
        ExprKind::Coalesce { left, right } => {
            walk_expr(left, globals, locals, out);
            walk_expr(right, globals, locals, out);
        }
        ExprKind::Await(inner) | ExprKind::Async(inner) => walk_expr(inner, globals, locals, out),
        ExprKind::ArrayLiteral(items) | ExprKind::SetLiteral(items) => {
            for i in items {
                walk_expr(i, globals, locals, out);
            }
        }
        ExprKind::MapLiteral(entries) => {
            for (k, v) in entries {
                walk_expr(k, globals, locals, out);
                walk_expr(v, globals, locals, out);
            }
        }
        ExprKind::ObjectLiteral { fields, .. } => {
            for f in fields {
                walk_expr(&f.value, globals, locals, out);
            }
        }
        ExprKind::New { args, .. } => {
            for a in args {
                walk_expr(a, globals, locals, out);
            }
        }
        _ => {}
    }
}

/// Is `ty` deeply immutable — a primitive/string, or a class whose fields
/// are all `const`/`readonly` and themselves deeply-immutable-typed?
pub fn is_deeply_immutable(ty: &Type, classes: &HashMap<String, Class>, seen: &mut HashSet<String>) -> bool {
    match ty {
        Type::Primitive(_) => true,
        Type::Null | Type::Unknown => true,
        Type::Enum(_) => true,
        Type::Weak(_) => false,
        Type::Class { name, .. } => {
            if !seen.insert(name.clone()) {
                return true; // recursive reference: don't loop forever
            }
            let Some(class) = classes.get(name) else {
                return false;
            };
            class.fields.iter().all(|f| {
                (f.qualifiers.is_const || f.qualifiers.is_readonly)
                    && is_deeply_immutable(&f.ty, classes, seen)
            })
        }
        Type::Array(elem) | Type::Set(elem) => is_deeply_immutable(elem, classes, seen),
        Type::Map(k, v) => is_deeply_immutable(k, classes, seen) && is_deeply_immutable(v, classes, seen),
        Type::Optional(inner) => is_deeply_immutable(inner, classes, seen),
        Type::Union(members) => members.iter().all(|m| is_deeply_immutable(m, classes, seen)),
        Type::Function { .. } | Type::Generic(_) => false,
    }
}

/// Checks every argument of an `async f(args)` call site for the immutable
/// argument rule.
pub fn check_call_args(args: &[Expr], classes: &HashMap<String, Class>) -> Vec<IsolationViolation> {
    let mut out = Vec::new();
    for a in args {
        let Some(ty) = &a.inferred_type else { continue };
        if matches!(ty, Type::Primitive(Primitive::String)) || matches!(ty, Type::Primitive(_)) {
            continue;
        }
        let mut seen = HashSet::new();
        if !is_deeply_immutable(ty, classes, &mut seen) {
            let name = match &a.kind {
                ExprKind::Identifier(n) => n.clone(),
                _ => "<expression>".to_string(),
            };
            out.push(IsolationViolation {
                identifier: name,
                reason: "argument to async call must be deeply immutable".to_string(),
            });
        }
    }
    out
}
