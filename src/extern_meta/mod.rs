//! Phase 7: Extern Metadata Collector — per-backend bridge descriptions for
//! `extern class` declarations (§4.7).
//!
//! Every `extern class` in the compilation set becomes an [`ExternClassMeta`]
//! record naming its header/module binding for the requested backend plus
//! its field and method shapes. A small curated set of library primitives
//! (`StringBuilder` today) is merged in unconditionally so backends never
//! have to special-case "is this a user extern or a built-in one".

use crate::ast::class::{ExternClass, Param};
use crate::ast::decl::Decl;
use crate::ast::types::Type;
use crate::ast::Program;

/// Which backend's header/module binding to resolve (§6 "target").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendTag {
    Cpp,
    Js,
    Bytecode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternFieldMeta {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternMethodMeta {
    pub name: String,
    pub is_static: bool,
    pub ret: Type,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternClassMeta {
    pub name: String,
    /// The binding string for the requested backend, if one was declared.
    pub header: Option<String>,
    pub fields: Vec<ExternFieldMeta>,
    pub methods: Vec<ExternMethodMeta>,
}

/// Collects every `extern class` in `program` plus the built-in curated set,
/// resolving each one's header/module binding against `target`.
pub fn collect(program: &Program, target: BackendTag) -> Vec<ExternClassMeta> {
    let span = tracing::debug_span!("extern_meta_collect", target = ?target);
    let _enter = span.enter();

    let mut out: Vec<ExternClassMeta> = program
        .decls()
        .filter_map(|d| match d {
            Decl::ExternClass(ec) => Some(describe(ec, target)),
            _ => None,
        })
        .collect();

    for builtin in builtins() {
        if !out.iter().any(|m| m.name == builtin.name) {
            out.push(resolve_binding(&builtin, target));
        }
    }

    tracing::debug!(count = out.len(), "extern metadata collected");
    out
}

fn describe(ec: &ExternClass, target: BackendTag) -> ExternClassMeta {
    ExternClassMeta {
        name: ec.name.clone(),
        header: match target {
            BackendTag::Cpp => ec.binding.cpp.clone(),
            BackendTag::Js => ec.binding.js.clone(),
            BackendTag::Bytecode => ec.binding.bytecode.clone(),
        },
        fields: ec
            .fields
            .iter()
            .map(|f| ExternFieldMeta {
                name: f.name.clone(),
                ty: f.ty.clone(),
                is_static: f.is_static,
            })
            .collect(),
        methods: ec
            .methods
            .iter()
            .map(|m| ExternMethodMeta {
                name: m.name.clone(),
                is_static: m.is_static,
                ret: m.ret.clone(),
                params: m.params.clone(),
            })
            .collect(),
    }
}

/// A built-in extern class, carried as its own binding-less `ExternClass` so
/// it can be resolved through the same `describe` path as a user-declared
/// one once a concrete binding is attached.
struct Builtin {
    name: String,
    bindings: (Option<String>, Option<String>, Option<String>),
    fields: Vec<ExternFieldMeta>,
    methods: Vec<ExternMethodMeta>,
}

fn resolve_binding(b: &Builtin, target: BackendTag) -> ExternClassMeta {
    ExternClassMeta {
        name: b.name.clone(),
        header: match target {
            BackendTag::Cpp => b.bindings.0.clone(),
            BackendTag::Js => b.bindings.1.clone(),
            BackendTag::Bytecode => b.bindings.2.clone(),
        },
        fields: b.fields.clone(),
        methods: b.methods.clone(),
    }
}

/// The curated built-in set (§4.7 "e.g. StringBuilder").
fn builtins() -> Vec<Builtin> {
    vec![Builtin {
        name: "StringBuilder".to_string(),
        bindings: (
            Some("<sstream>".to_string()),
            None,
            Some("stringbuilder".to_string()),
        ),
        fields: Vec::new(),
        methods: vec![
            ExternMethodMeta {
                name: "append".to_string(),
                is_static: false,
                ret: Type::void(),
                params: vec![Param {
                    name: "value".to_string(),
                    ty: Type::string(),
                }],
            },
            ExternMethodMeta {
                name: "toString".to_string(),
                is_static: false,
                ret: Type::string(),
                params: Vec::new(),
            },
        ],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    #[test]
    fn user_extern_class_resolves_header_for_requested_backend() {
        let src = r#"extern class Logger from { cpp: "logger.h", js: "logger.js" } {
            static function log(msg: string): void;
        }"#;
        let tokens = Lexer::new(src, "t.tx").tokenize();
        let result = parse(tokens);
        assert!(result.errors.is_empty(), "{:?}", result.errors);

        let cpp = collect(&result.program, BackendTag::Cpp);
        let logger = cpp.iter().find(|m| m.name == "Logger").unwrap();
        assert_eq!(logger.header.as_deref(), Some("logger.h"));

        let js = collect(&result.program, BackendTag::Js);
        let logger_js = js.iter().find(|m| m.name == "Logger").unwrap();
        assert_eq!(logger_js.header.as_deref(), Some("logger.js"));
    }

    #[test]
    fn builtin_string_builder_is_always_present() {
        let result = parse(Lexer::new("let x: int = 1;", "t.tx").tokenize());
        let metas = collect(&result.program, BackendTag::Cpp);
        assert!(metas.iter().any(|m| m.name == "StringBuilder"));
    }

    #[test]
    fn user_declared_extern_class_overrides_a_same_named_builtin() {
        let src = r#"extern class StringBuilder from "custom_sb.h" {
            function append(v: string): void;
        }"#;
        let tokens = Lexer::new(src, "t.tx").tokenize();
        let result = parse(tokens);
        let metas = collect(&result.program, BackendTag::Cpp);
        let matches: Vec<&ExternClassMeta> = metas.iter().filter(|m| m.name == "StringBuilder").collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].header.as_deref(), Some("custom_sb.h"));
    }
}
