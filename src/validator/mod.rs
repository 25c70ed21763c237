//! Phase 5: Validator — single-pass-per-file, two-phase-overall semantic
//! analysis (§4.4).
//!
//! **Two-phase overall** resolves cyclic symbol references (§9): a
//! declaration pass installs every class/enum/interface/function/type-alias
//! stub across the whole compilation set before any method or function body
//! is type-checked, so forward references and mutual recursion resolve.
//! The body pass then walks every statement and expression, writing
//! `inferred_type`, narrowing facts, and codegen hints.

pub mod async_isolation;
pub mod diagnostics;
pub mod discriminated_union;
pub mod narrowing;
pub mod scope;
pub mod types;

use crate::ast::class::Class;
use crate::ast::decl::{Decl, Enum, Function, TypeAlias, Variable};
use crate::ast::expr::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};
use crate::ast::ids::NodeId;
use crate::ast::stmt::{CaseLabel, ForOfSource, Stmt, StmtKind};
use crate::ast::types::{is_admissible_key_type, make_union, types_equal, Primitive, Type};
use crate::ast::{Item, Program};
use diagnostics::Diagnostic;
use scope::{Symbol, SymbolKind};
use std::collections::{HashMap, HashSet};

/// Everything a backend receives alongside the validated `Program` (§6
/// "AST/handoff contract to backends").
pub struct GlobalContext {
    pub diagnostics: Vec<Diagnostic>,
    pub narrowing: HashMap<NodeId, Type>,
    pub classes: HashMap<String, Class>,
    pub enums: HashMap<String, Enum>,
    pub type_aliases: HashMap<String, TypeAlias>,
    pub functions: HashMap<String, Function>,
    /// Union type name -> discriminant table, for members that qualify
    /// (§4.5). Populated only for unions produced by `type U = A | B` where
    /// every member is a discriminated class.
    pub discriminants: HashMap<String, discriminated_union::DiscriminantMap>,
    /// Monomorphization keys discovered at call sites (§4.6), consumed by
    /// the monomorphizer. A plain list rather than a set: `Type` has no
    /// `Hash`/`Eq` impl (structural equality is via `types_equal`), and the
    /// monomorphizer dedups itself when it builds its specialization set.
    pub generic_instantiations: Vec<(String, Vec<Type>)>,
}

impl GlobalContext {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// An empty context, used when a caller skips validation (`--no-validation`,
    /// `TranspileOptions.validate == false`) but still needs a `GlobalContext`
    /// to hand a backend (§6 "when false, skip semantic checks, still parse").
    pub fn empty() -> Self {
        GlobalContext {
            diagnostics: Vec::new(),
            narrowing: HashMap::new(),
            classes: HashMap::new(),
            enums: HashMap::new(),
            type_aliases: HashMap::new(),
            functions: HashMap::new(),
            discriminants: HashMap::new(),
            generic_instantiations: Vec::new(),
        }
    }
}

pub struct Validator {
    scopes: scope::ScopeStack,
    diagnostics: Vec<Diagnostic>,
    globals: HashSet<String>,
    current_async: bool,
    generic_instantiations: Vec<(String, Vec<Type>)>,
    discriminants: HashMap<String, discriminated_union::DiscriminantMap>,
    union_member_types: HashMap<String, Vec<String>>,
}

/// Validates one already-parsed, already-desugared `Program` in place,
/// mutating `inferred_type` on every expression node.
pub fn validate(program: &mut Program) -> GlobalContext {
    let span = tracing::debug_span!("validator", items = program.items.len());
    let _enter = span.enter();

    let mut v = Validator {
        scopes: scope::ScopeStack::new(),
        diagnostics: Vec::new(),
        globals: HashSet::new(),
        current_async: false,
        generic_instantiations: Vec::new(),
        discriminants: HashMap::new(),
        union_member_types: HashMap::new(),
    };
    v.declaration_pass(program);
    v.detect_discriminated_unions();
    v.body_pass(program);

    tracing::debug!(
        errors = v.diagnostics.len(),
        generic_call_sites = v.generic_instantiations.len(),
        "validation complete"
    );

    GlobalContext {
        diagnostics: v.diagnostics,
        narrowing: v.scopes.narrowing,
        classes: v.scopes.classes,
        enums: v.scopes.enums,
        type_aliases: v.scopes.type_aliases,
        functions: v.scopes.functions,
        discriminants: v.discriminants,
        generic_instantiations: v.generic_instantiations,
    }
}

impl Validator {
    fn declaration_pass(&mut self, program: &Program) {
        for item in &program.items {
            let Item::Decl(decl) = item else { continue };
            match decl {
                Decl::Class(c) => {
                    self.scopes.classes.insert(c.name.clone(), c.clone());
                }
                Decl::ExternClass(c) => {
                    self.scopes.extern_classes.insert(c.name.clone(), c.clone());
                }
                Decl::Enum(e) => {
                    self.scopes.enums.insert(e.name.clone(), e.clone());
                }
                Decl::TypeAlias(t) => {
                    self.scopes.type_aliases.insert(t.name.clone(), t.clone());
                    if let Type::Union(members) = &t.ty {
                        let names: Vec<String> = members
                            .iter()
                            .filter_map(|m| match m {
                                Type::Class { name, .. } => Some(name.clone()),
                                _ => None,
                            })
                            .collect();
                        self.union_member_types.insert(t.name.clone(), names);
                    }
                }
                Decl::Function(f) => {
                    self.scopes.functions.insert(f.name.clone(), f.clone());
                }
                Decl::Variable(v) => {
                    self.globals.insert(v.name.clone());
                    self.scopes.declare(Symbol {
                        name: v.name.clone(),
                        ty: v.annotation.clone().unwrap_or(Type::Unknown),
                        kind: SymbolKind::Variable,
                        is_const: v.is_const,
                        is_readonly: false,
                    });
                }
                Decl::Interface(_) | Decl::Import(_) => {}
            }
        }
    }

    fn detect_discriminated_unions(&mut self) {
        for (name, members) in &self.union_member_types {
            if let Some(map) = discriminated_union::detect(members, &self.scopes.classes) {
                self.discriminants.insert(name.clone(), map);
            }
        }
    }

    fn body_pass(&mut self, program: &mut Program) {
        for item in &mut program.items {
            match item {
                Item::Decl(Decl::Function(f)) => self.check_function(f),
                Item::Decl(Decl::Class(c)) => self.check_class(c),
                Item::Decl(Decl::Variable(v)) => self.check_variable(v),
                Item::Stmt(s) => self.check_stmt(s),
                _ => {}
            }
        }
    }

    fn check_function(&mut self, f: &mut Function) {
        self.scopes.push();
        self.scopes.current_mut().enclosing_function = Some(f.name.clone());
        for p in &f.params {
            self.scopes.declare(Symbol {
                name: p.name.clone(),
                ty: p.ty.clone(),
                kind: SymbolKind::Parameter,
                is_const: false,
                is_readonly: false,
            });
        }
        let was_async = self.current_async;
        self.current_async = f.is_async;
        if f.is_async {
            let param_names: HashSet<String> = f.params.iter().map(|p| p.name.clone()).collect();
            for v in async_isolation::check_no_global_access(&f.body, &self.globals, &param_names) {
                self.diagnostics.push(Diagnostic::error(
                    &f.span,
                    format!("cannot access global variables: '{}'", v.identifier),
                ));
            }
        }
        self.check_stmt(&mut f.body);
        self.current_async = was_async;
        self.scopes.pop();
    }

    fn check_class(&mut self, c: &mut Class) {
        for field in &mut c.fields {
            if let Some(default) = &mut field.default {
                self.check_expr(default);
                if !types::is_assignable(default.inferred_type.as_ref().unwrap_or(&Type::Unknown), &field.ty) {
                    self.diagnostics.push(Diagnostic::error(
                        &field.span,
                        format!(
                            "field '{}' default value is not assignable to declared type '{}'",
                            field.name, field.ty
                        ),
                    ));
                }
            }
            if field.qualifiers.is_const && field.qualifiers.is_readonly {
                self.diagnostics.push(Diagnostic::error(
                    &field.span,
                    "'const' and 'readonly' are mutually exclusive on the same field".to_string(),
                ));
            }
            // Only `const` fields (including `static const`) require a
            // default (§3 invariants); a plain `static` (non-const) field
            // may be left without one.
            if field.qualifiers.is_const && field.default.is_none() {
                self.diagnostics.push(Diagnostic::error(
                    &field.span,
                    format!("field '{}' requires a default value", field.name),
                ));
            }
        }
        for method in &mut c.methods {
            self.scopes.push();
            self.scopes.current_mut().enclosing_class = Some(c.name.clone());
            self.scopes.current_mut().is_static_context = method.is_static;
            for p in &method.params {
                self.scopes.declare(Symbol {
                    name: p.name.clone(),
                    ty: p.ty.clone(),
                    kind: SymbolKind::Parameter,
                    is_const: false,
                    is_readonly: false,
                });
            }
            self.check_stmt(&mut method.body);
            self.scopes.pop();
        }
    }

    fn check_variable(&mut self, v: &mut Variable) {
        if v.is_const && v.initializer.is_none() {
            self.diagnostics.push(Diagnostic::error(
                &v.span,
                format!("const variable '{}' requires an initializer", v.name),
            ));
        }
        if let Some(init) = &mut v.initializer {
            self.check_expr_with_expected(init, v.annotation.as_ref());
            let inferred = init.inferred_type.clone().unwrap_or(Type::Unknown);
            if let Some(ann) = &v.annotation {
                if !types::is_assignable(&inferred, ann) {
                    self.diagnostics.push(Diagnostic::error(
                        &v.span,
                        format!(
                            "cannot assign value of type '{}' to variable of type '{}'",
                            inferred, ann
                        ),
                    ));
                }
            } else {
                v.annotation = Some(inferred);
            }
        }
        self.scopes.declare(Symbol {
            name: v.name.clone(),
            ty: v.annotation.clone().unwrap_or(Type::Unknown),
            kind: SymbolKind::Variable,
            is_const: v.is_const,
            is_readonly: false,
        });
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Block(stmts) => {
                self.scopes.push();
                for s in stmts {
                    self.check_stmt(s);
                }
                self.scopes.pop();
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_expr(cond);
                let flat = self.flat_discriminants();
                let guard = {
                    let scopes = &self.scopes;
                    narrowing::recognize_guard(cond, &|name| scopes.resolve(name).map(|s| s.ty), &flat)
                };
                self.scopes.push();
                if let Some(g) = &guard {
                    if let Some(sym) = self.scopes.resolve(&g.subject) {
                        self.scopes.declare(Symbol {
                            ty: g.then_type.clone(),
                            ..sym
                        });
                    }
                    self.scopes.narrowing.insert(then_branch.id, g.then_type.clone());
                }
                let then_diverges = stmt_diverges(then_branch);
                self.check_stmt(then_branch);
                self.scopes.pop();
                if let Some(else_branch) = else_branch {
                    self.scopes.push();
                    if let Some(g) = &guard {
                        if let Some(else_ty) = &g.else_type {
                            if let Some(sym) = self.scopes.resolve(&g.subject) {
                                self.scopes.declare(Symbol {
                                    ty: else_ty.clone(),
                                    ..sym
                                });
                            }
                        }
                    }
                    self.check_stmt(else_branch);
                    self.scopes.pop();
                } else if then_diverges {
                    // Flow-sensitive narrowing (§4.4): an `if` with no
                    // `else` whose consequent provably never falls through
                    // leaves the complementary refinement in force for the
                    // rest of the enclosing block, not just a nested scope
                    // that's already gone by the next statement.
                    if let Some(g) = &guard {
                        if let Some(else_ty) = &g.else_type {
                            self.scopes.narrow_in_place(&g.subject, else_ty.clone());
                        }
                    }
                }
            }
            StmtKind::For { init, cond, step, body } => {
                self.scopes.push();
                if let Some(i) = init {
                    self.check_stmt(i);
                }
                if let Some(c) = cond {
                    self.check_expr(c);
                }
                if let Some(s) = step {
                    self.check_expr(s);
                }
                self.check_stmt(body);
                self.scopes.pop();
            }
            StmtKind::ForOf {
                binding,
                source,
                body,
                is_const,
            } => {
                self.scopes.push();
                let elem_ty = match source {
                    ForOfSource::Range { start, end, .. } => {
                        self.check_expr(start);
                        self.check_expr(end);
                        Type::int()
                    }
                    ForOfSource::Collection(e) => {
                        self.check_expr(e);
                        match e.inferred_type.clone() {
                            Some(Type::Array(elem)) | Some(Type::Set(elem)) => *elem,
                            _ => Type::Unknown,
                        }
                    }
                };
                self.scopes.declare(Symbol {
                    name: binding.clone(),
                    ty: elem_ty,
                    kind: SymbolKind::Variable,
                    is_const: *is_const,
                    is_readonly: false,
                });
                self.check_stmt(body);
                self.scopes.pop();
            }
            StmtKind::While { cond, body } => {
                self.check_expr(cond);
                self.check_stmt(body);
            }
            StmtKind::Switch { subject, cases } => {
                self.check_expr(subject);
                for case in cases {
                    for label in &mut case.labels {
                        if let CaseLabel::Value(e) = label {
                            self.check_expr(e);
                        }
                    }
                    self.scopes.push();
                    for s in &mut case.body {
                        self.check_stmt(s);
                    }
                    self.scopes.pop();
                }
            }
            StmtKind::Return(Some(e)) => self.check_expr(e),
            StmtKind::Expression(e) => self.check_expr(e),
            StmtKind::Declaration(Decl::Variable(v)) => self.check_variable(v),
            StmtKind::Declaration(_) => {}
            StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue | StmtKind::Blank { .. } => {}
        }
    }

    fn flat_discriminants(&self) -> HashMap<(String, String), Type> {
        let mut map = HashMap::new();
        for (union_name, dmap) in &self.discriminants {
            let key_ty = Type::Class {
                name: union_name.clone(),
                args: None,
            };
            for (tag, member_ty) in &dmap.by_value {
                map.insert((key_ty.to_string(), tag.clone()), member_ty.clone());
            }
        }
        map
    }

    fn check_expr_with_expected(&mut self, expr: &mut Expr, expected: Option<&Type>) {
        // Reverse inference (§4.4): an annotated declaration's expected
        // type propagates into numeric literals/operators in the
        // initializer before ordinary inference runs.
        if let Some(expected) = expected {
            self.propagate_expected(expr, expected);
        }
        self.check_expr(expr);
    }

    fn propagate_expected(&mut self, expr: &mut Expr, expected: &Type) {
        let literal_int = match &expr.kind {
            ExprKind::Literal(Literal::Int(v)) => Some(*v),
            _ => None,
        };
        if let Some(v) = literal_int {
            if matches!(
                expected,
                Type::Primitive(Primitive::Float) | Type::Primitive(Primitive::Double)
            ) {
                expr.kind = ExprKind::Literal(Literal::Fractional(format!("{v}.0")));
            }
            return;
        }
        if expected.is_numeric() {
            if let ExprKind::Binary { left, right, .. } = &mut expr.kind {
                self.propagate_expected(left, expected);
                self.propagate_expected(right, expected);
            }
        }
    }

    fn check_expr(&mut self, expr: &mut Expr) {
        let ty = self.infer_expr(expr);
        expr.inferred_type = Some(ty);
    }

    fn infer_expr(&mut self, expr: &mut Expr) -> Type {
        match &mut expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Int(_) => Type::int(),
                Literal::Fractional(_) => Type::double(),
                Literal::Char(_) => Type::char(),
                Literal::Str(_) => Type::string(),
                Literal::Bool(_) => Type::bool(),
                Literal::Null => Type::Null,
            },
            ExprKind::Identifier(name) => match self.scopes.resolve(name.as_str()) {
                Some(sym) => sym.ty,
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        &expr.span,
                        format!("undefined identifier '{name}'"),
                    ));
                    Type::Unknown
                }
            },
            ExprKind::This => self
                .scopes
                .current()
                .enclosing_class
                .clone()
                .map(|name| Type::Class { name, args: None })
                .unwrap_or(Type::Unknown),
            ExprKind::Member { object, name } => {
                let obj_ty = self.infer_boxed(object);
                self.member_type(&obj_ty, name.as_str(), &expr.span)
            }
            ExprKind::Index { object, index } => {
                let obj_ty = self.infer_boxed(object);
                let idx_ty = self.infer_boxed(index);
                match obj_ty {
                    Type::Array(elem) => *elem,
                    Type::Map(key, val) => {
                        if !types_equal(&idx_ty, &key) {
                            self.diagnostics.push(Diagnostic::error(
                                &expr.span,
                                format!("map index type '{idx_ty}' does not match key type '{key}'"),
                            ));
                        }
                        *val
                    }
                    _ => Type::Unknown,
                }
            }
            ExprKind::Call { callee, args, type_args } => self.infer_call(callee, args, type_args, &expr.span),
            ExprKind::ObjectLiteral { class_name, fields } => {
                for f in fields.iter_mut() {
                    self.check_expr(&mut f.value);
                }
                match class_name {
                    Some(name) => {
                        self.check_object_literal(name.as_str(), fields.as_slice(), &expr.span);
                        Type::Class {
                            name: name.clone(),
                            args: None,
                        }
                    }
                    None => {
                        self.diagnostics.push(Diagnostic::error(
                            &expr.span,
                            "object literal has no class context".to_string(),
                        ));
                        Type::Unknown
                    }
                }
            }
            ExprKind::ArrayLiteral(items) => {
                let tys: Vec<Type> = items.iter_mut().map(|e| self.infer_expr(e)).collect();
                for (item, t) in items.iter_mut().zip(&tys) {
                    item.inferred_type = Some(t.clone());
                }
                let elem = types::common_supertype(&tys).unwrap_or(Type::Unknown);
                Type::Array(Box::new(elem))
            }
            ExprKind::MapLiteral(entries) => {
                let mut key_ty = None;
                let mut val_ty = None;
                for (k, v) in entries.iter_mut() {
                    let kt = self.infer_expr(k);
                    let vt = self.infer_expr(v);
                    if !is_admissible_key_type(&kt) {
                        self.diagnostics.push(Diagnostic::error(
                            &k.span,
                            format!("type '{kt}' is not admissible as a map key"),
                        ));
                    }
                    key_ty.get_or_insert_with(|| kt.clone());
                    val_ty.get_or_insert_with(|| vt.clone());
                }
                Type::Map(
                    Box::new(key_ty.unwrap_or(Type::Unknown)),
                    Box::new(val_ty.unwrap_or(Type::Unknown)),
                )
            }
            ExprKind::SetLiteral(items) => {
                let tys: Vec<Type> = items.iter_mut().map(|e| self.infer_expr(e)).collect();
                for t in &tys {
                    if !is_admissible_key_type(t) {
                        self.diagnostics.push(Diagnostic::error(
                            &expr.span,
                            format!("type '{t}' is not admissible as a set element"),
                        ));
                    }
                }
                Type::Set(Box::new(types::common_supertype(&tys).unwrap_or(Type::Unknown)))
            }
            ExprKind::EnumShorthand(member) => {
                for (name, e) in &self.scopes.enums {
                    if e.members.iter().any(|m| m.name.as_str() == member.as_str()) {
                        return Type::Enum(name.clone());
                    }
                }
                self.diagnostics.push(Diagnostic::error(
                    &expr.span,
                    format!("'.{member}' does not match any enum member"),
                ));
                Type::Unknown
            }
            ExprKind::Binary { op, left, right } => self.infer_binary(op.clone(), left, right, &expr.span),
            ExprKind::Unary { op, operand } => {
                let t = self.infer_boxed(operand);
                match op {
                    UnaryOp::Neg if t.is_numeric() => t,
                    UnaryOp::Not if matches!(t, Type::Primitive(Primitive::Bool)) => t,
                    UnaryOp::Neg | UnaryOp::Not => {
                        self.diagnostics.push(Diagnostic::error(
                            &expr.span,
                            format!("operator not applicable to type '{t}'"),
                        ));
                        Type::Unknown
                    }
                }
            }
            ExprKind::Range { start, end, .. } => {
                let s = self.infer_boxed(start);
                let e = self.infer_boxed(end);
                if !matches!(s, Type::Primitive(Primitive::Int)) || !matches!(e, Type::Primitive(Primitive::Int)) {
                    self.diagnostics.push(Diagnostic::error(
                        &expr.span,
                        "range bounds must be int".to_string(),
                    ));
                }
                Type::int()
            }
            ExprKind::Template { tag, parts } => self.infer_template(tag, parts, &expr.span),
            ExprKind::Lambda { params, ret, body } => {
                self.scopes.push();
                for (name, ty) in params.iter() {
                    self.scopes.declare(Symbol {
                        name: name.clone(),
                        ty: ty.clone().unwrap_or(Type::Unknown),
                        kind: SymbolKind::Parameter,
                        is_const: false,
                        is_readonly: false,
                    });
                }
                self.check_stmt(body);
                self.scopes.pop();
                Type::Function {
                    params: params.iter().map(|(_, t)| t.clone().unwrap_or(Type::Unknown)).collect(),
                    ret: Box::new(ret.clone().unwrap_or(Type::Unknown)),
                }
            }
            ExprKind::Async(inner) => {
                let t = self.infer_boxed(inner);
                if let ExprKind::Call { args, .. } = &inner.kind {
                    for v in async_isolation::check_call_args(args, &self.scopes.classes) {
                        self.diagnostics.push(Diagnostic::error(
                            &expr.span,
                            format!("{}: {}", v.reason, v.identifier),
                        ));
                    }
                }
                t
            }
            ExprKind::Await(inner) => self.infer_boxed(inner),
            ExprKind::IsType { value, ty } => {
                self.infer_boxed(value);
                let _ = ty;
                Type::bool()
            }
            ExprKind::Cast { value, ty } => {
                self.infer_boxed(value);
                ty.clone()
            }
            ExprKind::New { class_name, args, type_args } => {
                for a in args.iter_mut() {
                    self.check_expr(a);
                }
                if self.scopes.extern_classes.contains_key(class_name.as_str()) {
                    // extern classes have no constructor body to check here;
                    // their static factories are validated at the call site.
                }
                let args_ty = type_args.clone();
                if let Some(targs) = &args_ty {
                    self.generic_instantiations
                        .push((class_name.clone(), targs.clone()));
                }
                Type::Class {
                    name: class_name.clone(),
                    args: args_ty,
                }
            }
            ExprKind::Assign { target, value } => {
                let target_ty = self.infer_boxed(target);
                let value_ty = self.infer_boxed(value);
                if !types::is_assignable(&value_ty, &target_ty) {
                    self.diagnostics.push(Diagnostic::error(
                        &expr.span,
                        format!("cannot assign value of type '{value_ty}' to target of type '{target_ty}'"),
                    ));
                }
                self.check_assignment_target(target);
                target_ty
            }
            ExprKind::Coalesce { left, right } => {
                let l = self.infer_boxed(left);
                let r = self.infer_boxed(right);
                if !l.accepts_null() {
                    self.diagnostics.push(Diagnostic::error(
                        &expr.span,
                        "left side of '??' is not nullable".to_string(),
                    ));
                }
                make_union(vec![l.non_null(), r])
            }
        }
    }

    fn infer_boxed(&mut self, e: &mut Expr) -> Type {
        let t = self.infer_expr(e);
        e.inferred_type = Some(t.clone());
        t
    }

    /// Enforces the §3/§4.4 mutation rules on an assignment's left-hand
    /// side: `const`/`readonly` fields and `const` locals may not be
    /// reassigned, and a private field may only be written from within its
    /// declaring class's own methods.
    fn check_assignment_target(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Identifier(name) => {
                if let Some(sym) = self.scopes.resolve(name) {
                    if sym.is_const {
                        self.diagnostics.push(Diagnostic::error(
                            &target.span,
                            format!("cannot reassign const '{name}'"),
                        ));
                    } else if sym.is_readonly {
                        self.diagnostics.push(Diagnostic::error(
                            &target.span,
                            format!("cannot reassign readonly '{name}' outside its constructor"),
                        ));
                    }
                }
            }
            ExprKind::Member { object, name } => {
                if let Some(Type::Class { name: class_name, .. }) = object.inferred_type.clone() {
                    if let Some(class) = self.scopes.classes.get(&class_name).cloned() {
                        if let Some(field) = class.fields.iter().find(|f| &f.name == name) {
                            if field.qualifiers.is_const {
                                self.diagnostics.push(Diagnostic::error(
                                    &target.span,
                                    format!("cannot reassign const field '{name}'"),
                                ));
                            } else if field.qualifiers.is_readonly {
                                self.diagnostics.push(Diagnostic::error(
                                    &target.span,
                                    format!("cannot reassign readonly field '{name}' outside its constructor"),
                                ));
                            }
                            self.check_private_access(&class_name, name, field.visibility, &target.span);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// A `private` field/method is only visible from methods of the
    /// declaring class (§4.4). Public members and accesses from within the
    /// declaring class itself are always allowed.
    fn check_private_access(
        &mut self,
        class_name: &str,
        member_name: &str,
        visibility: crate::ast::class::Visibility,
        span: &crate::span::Span,
    ) {
        if visibility != crate::ast::class::Visibility::Private {
            return;
        }
        if self.scopes.current().enclosing_class.as_deref() == Some(class_name) {
            return;
        }
        self.diagnostics.push(Diagnostic::error(
            span,
            format!("'{member_name}' is private and only accessible within class '{class_name}'"),
        ));
    }

    fn member_type(&mut self, obj_ty: &Type, name: &str, span: &crate::span::Span) -> Type {
        match obj_ty {
            Type::Class { name: class_name, .. } => {
                if let Some(class) = self.scopes.classes.get(class_name).cloned() {
                    if let Some(field) = class.fields.iter().find(|f| &f.name == name) {
                        self.check_private_access(class_name, name, field.visibility, span);
                        return field.ty.clone();
                    }
                    if let Some(method) = class.methods.iter().find(|m| &m.name == name) {
                        self.check_private_access(class_name, name, method.visibility, span);
                        return Type::Function {
                            params: method.params.iter().map(|p| p.ty.clone()).collect(),
                            ret: Box::new(method.ret.clone()),
                        };
                    }
                }
                if let Some(extern_class) = self.scopes.extern_classes.get(class_name).cloned() {
                    if let Some(field) = extern_class.fields.iter().find(|f| &f.name == name) {
                        return field.ty.clone();
                    }
                    if let Some(method) = extern_class.methods.iter().find(|m| &m.name == name) {
                        return Type::Function {
                            params: method.params.iter().map(|p| p.ty.clone()).collect(),
                            ret: Box::new(method.ret.clone()),
                        };
                    }
                }
                // `class_name` may name a `type U = A | B | …` alias rather
                // than a class directly (§4.5): a discriminated union's
                // shared tag field, or any other member common to every
                // union member, is still readable off the alias type.
                if !self.scopes.classes.contains_key(class_name)
                    && !self.scopes.extern_classes.contains_key(class_name)
                {
                    if let Some(alias) = self.scopes.type_aliases.get(class_name).cloned() {
                        if let Some(ty) = self.union_member_access_type(class_name, &alias.ty, name) {
                            return ty;
                        }
                    }
                }
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!("no member named '{name}' on class '{class_name}'"),
                ));
                Type::Unknown
            }
            Type::Weak(class_name) => {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!("dereferencing weak field '{class_name}' requires a null guard"),
                ));
                Type::Unknown
            }
            Type::Unknown => Type::Unknown,
            other => {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!("type '{other}' has no member '{name}'"),
                ));
                Type::Unknown
            }
        }
    }

    /// Resolves `name` on a `type U = A | B | …` alias (§4.5): the union's
    /// shared discriminant field if `name` is it, otherwise any member that
    /// every constituent class declares with an invariant type. A
    /// non-union alias (`type X = SomeClass`) forwards straight to its one
    /// aliased class. Returns `None` when no such common member exists.
    fn union_member_access_type(&self, alias_name: &str, aliased: &Type, name: &str) -> Option<Type> {
        let members: Vec<Type> = match aliased {
            Type::Union(members) => members.clone(),
            other => vec![other.clone()],
        };

        if let Some(dmap) = self.discriminants.get(alias_name) {
            if dmap.field_name == name {
                if let Some(Type::Class { name: member_name, .. }) = members.first() {
                    if let Some(class) = self.scopes.classes.get(member_name) {
                        if let Some(field) = class.fields.iter().find(|f| f.name == name) {
                            return Some(field.ty.clone());
                        }
                    }
                }
            }
        }

        let mut common: Option<Type> = None;
        for member in &members {
            let Type::Class { name: member_name, .. } = member else {
                return None;
            };
            let class = self.scopes.classes.get(member_name)?;
            let member_ty = if let Some(field) = class.fields.iter().find(|f| f.name == name) {
                field.ty.clone()
            } else if let Some(method) = class.methods.iter().find(|m| m.name == name) {
                Type::Function {
                    params: method.params.iter().map(|p| p.ty.clone()).collect(),
                    ret: Box::new(method.ret.clone()),
                }
            } else {
                return None;
            };
            match &common {
                None => common = Some(member_ty),
                Some(existing) if types_equal(existing, &member_ty) => {}
                Some(_) => return None,
            }
        }
        common
    }

    fn infer_binary(&mut self, op: BinaryOp, left: &mut Expr, right: &mut Expr, span: &crate::span::Span) -> Type {
        let l = self.infer_boxed(left);
        let r = self.infer_boxed(right);
        match op {
            BinaryOp::Add if types::is_string_plus(&l, &r) => {
                if types::is_char_string_mismatch(&l, &r) {
                    // char/string concatenation is allowed via string-plus
                    // coercion (§4.4): char becomes a one-character string.
                }
                Type::string()
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if l.is_numeric() && r.is_numeric() {
                    numeric_result(&l, &r)
                } else {
                    self.diagnostics.push(Diagnostic::error(
                        span,
                        format!("operator not applicable to types '{l}' and '{r}'"),
                    ));
                    Type::Unknown
                }
            }
            BinaryOp::Eq | BinaryOp::NotEq => {
                if types::is_char_string_mismatch(&l, &r) {
                    self.diagnostics.push(Diagnostic::error(
                        span,
                        "cannot compare 'char' and 'string' directly".to_string(),
                    ));
                }
                Type::bool()
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => Type::bool(),
            BinaryOp::And | BinaryOp::Or => Type::bool(),
        }
    }

    fn infer_call(
        &mut self,
        callee: &mut Expr,
        args: &mut [Expr],
        type_args: &mut Option<Vec<Type>>,
        span: &crate::span::Span,
    ) -> Type {
        for a in args.iter_mut() {
            self.check_expr(a);
        }
        if let ExprKind::Identifier(fn_name) = &callee.kind {
            if let Some(f) = self.scopes.functions.get(fn_name).cloned() {
                if f.is_generic() {
                    if let Some(targs) = type_args {
                        self.generic_instantiations
                            .push((fn_name.clone(), targs.clone()));
                    } else {
                        let inferred: Vec<Type> = args
                            .iter()
                            .map(|a| a.inferred_type.clone().unwrap_or(Type::Unknown))
                            .collect();
                        self.generic_instantiations.push((fn_name.clone(), inferred.clone()));
                        *type_args = Some(inferred);
                    }
                } else if args.len() != f.params.len() {
                    self.diagnostics.push(Diagnostic::error(
                        span,
                        format!(
                            "'{fn_name}' expects {} argument(s), found {}",
                            f.params.len(),
                            args.len()
                        ),
                    ));
                }
                return f.ret.clone();
            }
            if is_builtin_print(fn_name) {
                // `println`/`print` are host-provided, not user-declarable
                // functions (§8 Scenario 1): they accept one argument of any
                // printable type and return `void`. What "printable" means
                // for a non-primitive element type is left to the backend
                // (§9 open question), so no element-type check happens here.
                if args.len() != 1 {
                    self.diagnostics.push(Diagnostic::error(
                        span,
                        format!("'{fn_name}' expects 1 argument, found {}", args.len()),
                    ));
                }
                return Type::void();
            }
        }
        let callee_ty = self.infer_boxed(callee);
        match callee_ty {
            Type::Function { ret, .. } => *ret,
            Type::Unknown => Type::Unknown,
            other => {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!("type '{other}' is not callable"),
                ));
                Type::Unknown
            }
        }
    }

    fn infer_template(
        &mut self,
        tag: &Option<String>,
        parts: &mut [crate::ast::expr::TemplatePart],
        span: &crate::span::Span,
    ) -> Type {
        for part in parts.iter_mut() {
            if let crate::ast::expr::TemplatePart::Expr(e) = part {
                self.check_expr(e);
            }
        }
        let Some(tag_name) = tag else {
            return Type::string();
        };
        let Some(f) = self.scopes.functions.get(tag_name).cloned() else {
            self.diagnostics.push(Diagnostic::error(
                span,
                format!("tagged template function '{tag_name}' is undefined"),
            ));
            return Type::Unknown;
        };
        if f.params.len() != 2 {
            self.diagnostics.push(Diagnostic::error(
                span,
                format!("tagged template function '{tag_name}' must take exactly two parameters"),
            ));
        }
        f.ret
    }

    fn check_object_literal(
        &mut self,
        class_name: &str,
        fields: &[crate::ast::expr::ObjectField],
        span: &crate::span::Span,
    ) {
        let Some(class) = self.scopes.classes.get(class_name).cloned() else {
            self.diagnostics.push(Diagnostic::error(
                span,
                format!("unknown class '{class_name}'"),
            ));
            return;
        };
        for of in fields {
            let Some(decl_field) = class.fields.iter().find(|f| f.name == of.name) else {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!("class '{class_name}' has no field named '{}'", of.name),
                ));
                continue;
            };
            let provided_ty = of.value.inferred_type.clone().unwrap_or(Type::Unknown);
            if !types::is_assignable(&provided_ty, &decl_field.ty) {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!(
                        "field '{}' expects type '{}', found '{}'",
                        of.name, decl_field.ty, provided_ty
                    ),
                ));
            }
            if decl_field.visibility == crate::ast::class::Visibility::Private
                && self.scopes.current().enclosing_class.as_deref() != Some(class_name)
            {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!(
                        "private field '{}' may not be mentioned in an object literal outside class '{}'",
                        of.name, class_name
                    ),
                ));
            }
            if decl_field.qualifiers.is_const {
                if !literal_matches_default(&of.value, decl_field.default.as_ref()) {
                    self.diagnostics.push(Diagnostic::error(
                        span,
                        format!(
                            "const field '{}' may not be overridden with a different value",
                            of.name
                        ),
                    ));
                }
            }
        }
    }
}

/// Whether `stmt` is guaranteed to never fall through to whatever statement
/// follows it in its enclosing block — a bare `return`/`break`/`continue`,
/// a block whose last non-blank statement diverges, or an `if`/`else` whose
/// two branches both diverge. Used to decide whether a guard's
/// complementary narrowing survives an `if` with no `else` (§4.4).
fn stmt_diverges(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue => true,
        StmtKind::Block(stmts) => stmts
            .iter()
            .rev()
            .find(|s| !matches!(s.kind, StmtKind::Blank { .. }))
            .map(stmt_diverges)
            .unwrap_or(false),
        StmtKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => stmt_diverges(then_branch) && stmt_diverges(else_branch),
        _ => false,
    }
}

/// `println`/`print` are always available without a user declaration (§8
/// Scenario 1) — the host runtime provides them the way it provides
/// `StringBuilder` as a curated extern (§4.7), rather than requiring every
/// program to declare them.
fn is_builtin_print(name: &str) -> bool {
    name == "println" || name == "print"
}

fn numeric_result(l: &Type, r: &Type) -> Type {
    use Primitive::*;
    match (l, r) {
        (Type::Primitive(Double), _) | (_, Type::Primitive(Double)) => Type::double(),
        (Type::Primitive(Float), _) | (_, Type::Primitive(Float)) => Type::float(),
        _ => Type::int(),
    }
}

fn literal_matches_default(provided: &Expr, default: Option<&Expr>) -> bool {
    let Some(default) = default else { return false };
    match (&provided.kind, &default.kind) {
        (ExprKind::Literal(Literal::Str(a)), ExprKind::Literal(Literal::Str(b))) => a == b,
        (ExprKind::Literal(Literal::Int(a)), ExprKind::Literal(Literal::Int(b))) => a == b,
        (ExprKind::Literal(Literal::Bool(a)), ExprKind::Literal(Literal::Bool(b))) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    fn validate_source(src: &str) -> GlobalContext {
        let tokens = Lexer::new(src, "t.tx").tokenize();
        let mut result = parse(tokens);
        assert!(result.errors.is_empty(), "parse errors: {:?}", result.errors);
        validate(&mut result.program)
    }

    #[test]
    fn array_literal_elements_widen_to_common_numeric_type() {
        let ctx = validate_source("let xs = [1, 2, 3];");
        assert!(!ctx.has_errors());
    }

    #[test]
    fn const_field_override_with_different_value_is_rejected() {
        let ctx = validate_source(
            r#"
            class Point {
                const kind: string = "point";
                x: int;
                y: int;
            }
            let p = Point { kind: "pointy", x: 1, y: 2 };
            "#,
        );
        assert!(ctx.has_errors());
    }

    #[test]
    fn async_function_cannot_read_globals() {
        let ctx = validate_source(
            r#"
            let counter: int = 0;
            async function bump(): int {
                return counter;
            }
            "#,
        );
        assert!(ctx.has_errors());
    }

    #[test]
    fn println_of_an_array_is_accepted_without_a_user_declaration() {
        let ctx = validate_source("let numbers: int[] = [1, 2, 3]; println(numbers);");
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics);
    }

    #[test]
    fn dereferencing_a_weak_reference_without_a_null_guard_is_rejected() {
        let ctx = validate_source(
            r#"
            class Node {
                value: int;
            }
            function readValue(n: weak Node): int {
                return n.value;
            }
            "#,
        );
        assert!(ctx.has_errors());
    }

    #[test]
    fn dereferencing_a_weak_reference_behind_a_null_guard_is_accepted() {
        let ctx = validate_source(
            r#"
            class Node {
                value: int;
            }
            function readValue(n: weak Node): int {
                if (n == null) {
                    return 0;
                }
                return n.value;
            }
            "#,
        );
        assert!(!ctx.has_errors(), "{:?}", ctx.diagnostics);
    }

    #[test]
    fn generic_call_site_is_recorded_for_monomorphization() {
        let ctx = validate_source(
            r#"
            function identity<T>(v: T): T {
                return v;
            }
            let x = identity<int>(7);
            "#,
        );
        assert!(!ctx.has_errors());
        assert!(ctx
            .generic_instantiations
            .iter()
            .any(|(name, args)| name == "identity" && args == &vec![Type::int()]));
    }
}
