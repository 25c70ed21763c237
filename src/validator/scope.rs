//! Nested scopes and the symbol table (§4.4).
//!
//! A scope stack models global / per-function / per-block / per-lambda
//! nesting. Each frame carries its own symbol table plus the narrowing map
//! active for that block (shadowed on entry/exit of guarded blocks).

use crate::ast::ids::NodeId;
use crate::ast::types::Type;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Field,
    Function,
    Class,
    Enum,
    TypeAlias,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
    pub is_const: bool,
    pub is_readonly: bool,
}

/// One nesting level. `enclosing_class`/`enclosing_function` let name
/// resolution fall through to instance members / the surrounding function
/// per the lookup order in §4.4.
#[derive(Debug, Default)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
    pub enclosing_class: Option<String>,
    pub enclosing_function: Option<String>,
    pub is_static_context: bool,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    /// Declares `symbol` in this scope. Returns `false` (without mutating)
    /// on redeclaration within the same scope — shadowing from an *outer*
    /// scope is always allowed and is not this check's concern (§3
    /// invariant: "redeclaration in the same scope is an error").
    pub fn declare(&mut self, symbol: Symbol) -> bool {
        if self.symbols.contains_key(&symbol.name) {
            return false;
        }
        self.symbols.insert(symbol.name.clone(), symbol);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }
}

/// The live scope stack plus whole-compilation lookup tables (classes,
/// enums, interfaces, type aliases, top-level functions) that every scope
/// can see regardless of nesting.
#[derive(Default)]
pub struct ScopeStack {
    frames: Vec<Scope>,
    pub classes: HashMap<String, crate::ast::class::Class>,
    pub extern_classes: HashMap<String, crate::ast::class::ExternClass>,
    pub enums: HashMap<String, crate::ast::decl::Enum>,
    pub type_aliases: HashMap<String, crate::ast::decl::TypeAlias>,
    pub functions: HashMap<String, crate::ast::decl::Function>,
    /// Narrowing facts keyed by the expression node they refine (§4.4, §9).
    pub narrowing: HashMap<NodeId, Type>,
    /// Implicit-`this` scope-tracker notes: identifier node -> resolved to
    /// an instance member via implicit `this` (§4.4, §9).
    pub implicit_this: HashMap<NodeId, ()>,
}

impl ScopeStack {
    pub fn new() -> Self {
        let mut s = ScopeStack::default();
        s.frames.push(Scope::new());
        s
    }

    pub fn push(&mut self) {
        let parent_class = self.current().enclosing_class.clone();
        let parent_function = self.current().enclosing_function.clone();
        let parent_static = self.current().is_static_context;
        let mut frame = Scope::new();
        frame.enclosing_class = parent_class;
        frame.enclosing_function = parent_function;
        frame.is_static_context = parent_static;
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn current(&self) -> &Scope {
        self.frames.last().expect("scope stack is never empty")
    }

    pub fn current_mut(&mut self) -> &mut Scope {
        self.frames.last_mut().expect("scope stack is never empty")
    }

    pub fn declare(&mut self, symbol: Symbol) -> bool {
        self.current_mut().declare(symbol)
    }

    /// Overwrites the type of an already-declared symbol in place, in
    /// whichever frame (innermost first) currently holds it, rather than
    /// shadowing it in a fresh child scope. Used for flow-sensitive
    /// narrowing that must survive past the statement that established it
    /// (§4.4: a guard whose only branch diverges narrows the rest of the
    /// enclosing block, not just a nested scope). Returns `false` if no
    /// frame declares `name`.
    pub fn narrow_in_place(&mut self, name: &str, ty: Type) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if let Some(sym) = frame.get_mut(name) {
                sym.ty = ty;
                return true;
            }
        }
        false
    }

    /// Name resolution order inside a method body (§4.4): locals/parameters
    /// (innermost scope outward), then instance members via implicit
    /// `this` (skipped in a static context), then class statics, then the
    /// enclosing function, then globals. Instance/static members and the
    /// enclosing function are synthesized as owned `Symbol`s since they
    /// live on `Class`/`Function` declarations, not in a scope frame.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        for frame in self.frames.iter().rev() {
            if let Some(sym) = frame.get(name) {
                return Some(sym.clone());
            }
        }
        if let Some(class_name) = self.current().enclosing_class.clone() {
            if let Some(class) = self.classes.get(&class_name) {
                if !self.current().is_static_context {
                    if let Some(field) = class.fields.iter().find(|f| f.name == name) {
                        return Some(Symbol {
                            name: field.name.clone(),
                            ty: field.ty.clone(),
                            kind: SymbolKind::Field,
                            is_const: field.qualifiers.is_const,
                            is_readonly: field.qualifiers.is_readonly,
                        });
                    }
                }
                if let Some(field) = class
                    .fields
                    .iter()
                    .find(|f| f.name == name && f.qualifiers.is_static)
                {
                    return Some(Symbol {
                        name: field.name.clone(),
                        ty: field.ty.clone(),
                        kind: SymbolKind::Field,
                        is_const: field.qualifiers.is_const,
                        is_readonly: field.qualifiers.is_readonly,
                    });
                }
            }
        }
        if let Some(fn_name) = self.current().enclosing_function.clone() {
            if fn_name == name {
                if let Some(f) = self.functions.get(&fn_name) {
                    return Some(Symbol {
                        name: f.name.clone(),
                        ty: Type::Function {
                            params: f.params.iter().map(|p| p.ty.clone()).collect(),
                            ret: Box::new(f.ret.clone()),
                        },
                        kind: SymbolKind::Function,
                        is_const: false,
                        is_readonly: false,
                    });
                }
            }
        }
        if let Some(f) = self.functions.get(name) {
            return Some(Symbol {
                name: f.name.clone(),
                ty: Type::Function {
                    params: f.params.iter().map(|p| p.ty.clone()).collect(),
                    ret: Box::new(f.ret.clone()),
                },
                kind: SymbolKind::Function,
                is_const: false,
                is_readonly: false,
            });
        }
        None
    }
}
