//! Processing API (§6 "External interfaces") — pure functions wiring
//! lexer → parser → module loader → desugarer → validator → monomorphizer
//! → extern metadata collector into the two entry points backends are
//! built on. No I/O beyond what `transpileProject` needs to resolve
//! imports from disk; `transpile` takes source text directly and performs
//! none.

use crate::ast::stmt::StmtKind;
use crate::ast::{Item, Program};
use crate::desugar;
use crate::extern_meta::{self, BackendTag, ExternClassMeta};
use crate::lexer::Lexer;
use crate::module_loader;
use crate::parser;
use crate::validator::diagnostics::Diagnostic;
use crate::validator::{self, GlobalContext};
use std::path::PathBuf;

/// Backend target tag (§6 "target": one of the backend tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Cpp,
    Js,
    Bytecode,
}

impl Target {
    fn as_backend_tag(self) -> BackendTag {
        match self {
            Target::Cpp => BackendTag::Cpp,
            Target::Js => BackendTag::Js,
            Target::Bytecode => BackendTag::Bytecode,
        }
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpp" => Ok(Target::Cpp),
            "js" => Ok(Target::Js),
            "bytecode" => Ok(Target::Bytecode),
            other => Err(format!("unknown target '{other}'")),
        }
    }
}

/// Options controlling one `transpile`/`transpileProject` run (§6).
#[derive(Debug, Clone)]
pub struct TranspileOptions {
    pub target: Target,
    pub namespace: Option<String>,
    pub include_headers: Vec<String>,
    pub output_header: bool,
    pub output_source: bool,
    pub validate: bool,
    pub emit_line_directives: bool,
    pub allow_top_level_statements: bool,
    pub source_roots: Vec<PathBuf>,
    pub closed_world: bool,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        TranspileOptions {
            target: Target::Cpp,
            namespace: None,
            include_headers: Vec::new(),
            output_header: true,
            output_source: true,
            validate: true,
            emit_line_directives: false,
            allow_top_level_statements: false,
            source_roots: Vec::new(),
            closed_world: false,
        }
    }
}

/// Result of one `transpile` call. `header`/`source` are left `None` here:
/// this crate owns lexing through extern-metadata collection, not a
/// backend's own textual emission (§6 "AST/handoff contract to backends");
/// a `Backend` implementation turns `program`/`global_context` into them.
pub struct TranspileResult {
    pub program: Program,
    pub global_context: GlobalContext,
    pub extern_metadata: Vec<ExternClassMeta>,
    pub errors: Vec<Diagnostic>,
}

impl TranspileResult {
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(Diagnostic::is_error)
    }
}

/// Compiles one in-memory source string through the full mid-end pipeline
/// (§6 "Entry point (function form)"). Parse errors are always reported;
/// when `options.validate` is false, semantic analysis is skipped but
/// parsing still runs ("skip semantic checks, still parse").
pub fn transpile(source: &str, filename: &str, options: &TranspileOptions) -> TranspileResult {
    let span = tracing::info_span!("transpile", filename, target = ?options.target);
    let _enter = span.enter();

    let tokens = Lexer::new(source, filename).tokenize();
    let (parse_result, ids) = parser::parse_with_ids(tokens, crate::ast::ids::NodeIdGen::new());
    let mut errors: Vec<Diagnostic> = parse_result
        .errors
        .iter()
        .map(|e| Diagnostic::error(e.span(), e.to_string()))
        .collect();

    let mut program = parse_result.program;
    let mut ctx = GlobalContext::empty();

    if !errors.iter().any(Diagnostic::is_error) {
        run_mid_end(&mut program, options, &ids, &mut errors, &mut ctx);
    }

    let extern_metadata = extern_meta::collect(&program, options.target.as_backend_tag());

    tracing::info!(errors = errors.len(), "transpile finished");
    TranspileResult {
        program,
        global_context: ctx,
        extern_metadata,
        errors,
    }
}

/// Result of one `transpileProject` call (§6 "Project form").
pub struct ProjectResult {
    pub program: Program,
    pub global_context: GlobalContext,
    pub extern_metadata: Vec<ExternClassMeta>,
    pub errors: Vec<Diagnostic>,
    pub file_order: Vec<PathBuf>,
}

/// Compiles a set of files sharing one symbol table (§6 "Project form").
pub fn transpile_project(files: &[PathBuf], options: &TranspileOptions) -> ProjectResult {
    let span = tracing::info_span!("transpile_project", files = files.len());
    let _enter = span.enter();

    let load_result = module_loader::load(files, &options.source_roots);
    let mut errors = load_result.diagnostics;
    let mut program = load_result.program;
    let mut ctx = GlobalContext::empty();

    if !errors.iter().any(Diagnostic::is_error) {
        run_mid_end(&mut program, options, &load_result.ids, &mut errors, &mut ctx);
    }

    let extern_metadata = extern_meta::collect(&program, options.target.as_backend_tag());

    tracing::info!(errors = errors.len(), "transpile_project finished");
    ProjectResult {
        program,
        global_context: ctx,
        extern_metadata,
        errors,
        file_order: load_result.file_order,
    }
}

/// Desugar → validate → monomorphize, shared by both entry points. Runs
/// only once parsing/loading has produced zero errors (§7 "compilation
/// proceeds as long as the AST is traversable").
fn run_mid_end(
    program: &mut Program,
    options: &TranspileOptions,
    ids: &crate::ast::ids::NodeIdGen,
    errors: &mut Vec<Diagnostic>,
    ctx: &mut GlobalContext,
) {
    errors.extend(desugar::desugar_interfaces(program, options.closed_world, ids));

    if !options.validate {
        return;
    }

    *ctx = validator::validate(program);
    errors.extend(ctx.diagnostics.clone());

    if !options.allow_top_level_statements {
        for item in program.items.iter() {
            if let Item::Stmt(stmt) = item {
                if !matches!(stmt.kind, StmtKind::Declaration(_) | StmtKind::Blank { .. }) {
                    errors.push(Diagnostic::error(
                        &stmt.span,
                        "executable statements are not permitted outside a function",
                    ));
                }
            }
        }
    }

    if !errors.iter().any(Diagnostic::is_error) {
        let mresult = crate::monomorphize::monomorphize(program, ctx);
        errors.extend(mresult.diagnostics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpile_reports_parse_errors_without_running_the_mid_end() {
        let result = transpile("let x: int = ;", "t.tx", &TranspileOptions::default());
        assert!(result.has_errors());
    }

    #[test]
    fn transpile_reports_validation_errors_for_a_type_mismatch() {
        let result = transpile(
            "function f(): int { return \"no\"; }",
            "t.tx",
            &TranspileOptions::default(),
        );
        assert!(result.has_errors());
    }

    #[test]
    fn validate_false_skips_semantic_checks_but_still_parses() {
        let options = TranspileOptions {
            validate: false,
            ..TranspileOptions::default()
        };
        let result = transpile("function f(): int { return \"no\"; }", "t.tx", &options);
        assert!(!result.has_errors());
    }

    #[test]
    fn bare_top_level_statement_is_rejected_by_default() {
        let result = transpile("print(1);", "t.tx", &TranspileOptions::default());
        assert!(result.has_errors());
    }

    #[test]
    fn allow_top_level_statements_permits_a_bare_statement() {
        let options = TranspileOptions {
            allow_top_level_statements: true,
            ..TranspileOptions::default()
        };
        let result = transpile("let x: int = 1;\nx = x + 1;", "t.tx", &options);
        assert!(!result.has_errors(), "{:?}", result.errors);
    }

    #[test]
    fn generic_call_is_monomorphized_through_the_public_entry_point() {
        let src = r#"
            function identity<T>(v: T): T { return v; }
            let a = identity<int>(7);
        "#;
        let result = transpile(src, "t.tx", &TranspileOptions::default());
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert!(result
            .program
            .decls()
            .any(|d| d.name() == "identity__primitive_int"));
    }
}
