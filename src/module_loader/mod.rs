//! Phase 3: Module Loader — resolves `import` references across files into
//! one ordered compilation set sharing a single symbol table (§2, §5).
//!
//! Traversal is depth-first and deterministic: a file's imports are loaded
//! (and, transitively, *their* imports) before the file's own items are
//! appended to the merged program, so declarations become visible in
//! dependency order. Import cycles are detected and reported; per §5 the
//! loader does not fail the whole compilation on a cycle — it breaks the
//! cycle at the back-edge and continues, leaving the cyclic side's symbols
//! available without re-entering its body-level checks a second time.

use crate::ast::decl::Decl;
use crate::ast::ids::NodeIdGen;
use crate::ast::{Item, Program};
use crate::lexer::Lexer;
use crate::parser::{self, ParseError};
use crate::span::Span;
use crate::validator::diagnostics::Diagnostic;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub struct LoadResult {
    pub program: Program,
    pub ids: NodeIdGen,
    pub diagnostics: Vec<Diagnostic>,
    /// Files actually read, in load order (dependencies before dependents).
    pub file_order: Vec<PathBuf>,
}

struct Loader<'a> {
    source_roots: &'a [PathBuf],
    ids: NodeIdGen,
    diagnostics: Vec<Diagnostic>,
    file_order: Vec<PathBuf>,
    loaded: HashSet<PathBuf>,
    in_progress: HashSet<PathBuf>,
    items: Vec<Item>,
}

/// Loads `entry_files` and everything they transitively import, resolved
/// against each importer's own directory first and then `source_roots`
/// (§6 `sourceRoots`).
pub fn load(entry_files: &[PathBuf], source_roots: &[PathBuf]) -> LoadResult {
    let span = tracing::debug_span!("module_loader", entries = entry_files.len());
    let _enter = span.enter();
    let mut loader = Loader {
        source_roots,
        ids: NodeIdGen::new(),
        diagnostics: Vec::new(),
        file_order: Vec::new(),
        loaded: HashSet::new(),
        in_progress: HashSet::new(),
        items: Vec::new(),
    };
    for entry in entry_files {
        loader.load_file(entry);
    }
    tracing::debug!(files = loader.file_order.len(), "module load complete");
    LoadResult {
        program: Program::new(loader.items),
        ids: loader.ids,
        diagnostics: loader.diagnostics,
        file_order: loader.file_order,
    }
}

impl<'a> Loader<'a> {
    fn load_file(&mut self, path: &Path) {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.loaded.contains(&canonical) {
            return;
        }
        if self.in_progress.contains(&canonical) {
            self.diagnostics.push(Diagnostic::error(
                &Span::synthetic(Rc::from(path.to_string_lossy().as_ref())),
                format!("import cycle detected at '{}'", path.display()),
            ));
            return;
        }
        self.in_progress.insert(canonical.clone());

        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                self.diagnostics.push(Diagnostic::error(
                    &Span::synthetic(Rc::from(path.to_string_lossy().as_ref())),
                    format!("cannot read '{}': {e}", path.display()),
                ));
                self.in_progress.remove(&canonical);
                return;
            }
        };

        let filename = path.to_string_lossy().to_string();
        let tokens = Lexer::new(&source, &filename).tokenize();
        let ids = std::mem::replace(&mut self.ids, NodeIdGen::new());
        let (result, ids) = parser::parse_with_ids(tokens, ids);
        self.ids = ids;
        for e in &result.errors {
            self.diagnostics.push(parse_error_to_diagnostic(e));
        }

        let dir = path.parent().map(Path::to_path_buf);
        for item in &result.program.items {
            if let Item::Decl(Decl::Import(import)) = item {
                if let Some(resolved) = self.resolve_import(&import.from, dir.as_deref()) {
                    self.load_file(&resolved);
                } else {
                    self.diagnostics.push(Diagnostic::error(
                        &import.span,
                        format!("cannot resolve import '{}'", import.from),
                    ));
                }
            }
        }

        self.items.extend(result.program.items);
        self.in_progress.remove(&canonical);
        self.loaded.insert(canonical);
        self.file_order.push(path.to_path_buf());
    }

    /// Tries `from` relative to the importing file's own directory first,
    /// then each configured source root (§6 `sourceRoots`). A bare module
    /// specifier without an extension is tried both as given and with a
    /// `.tx` suffix.
    fn resolve_import(&self, from: &str, relative_to: Option<&Path>) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(dir) = relative_to {
            candidates.push(dir.join(from));
        }
        for root in self.source_roots {
            candidates.push(root.join(from));
        }
        for candidate in &candidates {
            if candidate.is_file() {
                return Some(candidate.clone());
            }
            let with_ext = candidate.with_extension("tx");
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        None
    }
}

fn parse_error_to_diagnostic(e: &ParseError) -> Diagnostic {
    Diagnostic::error(e.span(), e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_a_single_file_with_no_imports() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_file(dir.path(), "main.tx", "let x: int = 1;");
        let result = load(&[entry], &[]);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.file_order.len(), 1);
    }

    #[test]
    fn loads_dependency_before_dependent() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "util.tx", "function helper(): int { return 1; }");
        let entry = write_file(
            dir.path(),
            "main.tx",
            r#"import { helper } from "util.tx"; let x = helper();"#,
        );
        let result = load(&[entry], &[dir.path().to_path_buf()]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.file_order.len(), 2);
        assert!(result.file_order[0].ends_with("util.tx"));
        assert!(result.file_order[1].ends_with("main.tx"));
    }

    #[test]
    fn missing_import_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_file(dir.path(), "main.tx", r#"import { x } from "nope.tx";"#);
        let result = load(&[entry], &[]);
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn import_cycle_is_reported_and_does_not_hang() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.tx", r#"import { b } from "b.tx"; let a: int = 1;"#);
        let entry = write_file(dir.path(), "b.tx", r#"import { a } from "a.tx"; let b: int = 2;"#);
        let result = load(&[entry], &[dir.path().to_path_buf()]);
        assert!(result.diagnostics.iter().any(|d| d.message.contains("cycle")));
    }
}
