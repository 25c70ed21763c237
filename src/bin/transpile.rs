//! # Transpiler Command Line Interface
//!
//! A thin CLI wrapper around the `classlang_transpiler` processing API.
//!
//! ## Design Philosophy
//!
//! This binary follows a strict separation of concerns:
//!
//! - **CLI Layer**: argument parsing, file I/O, diagnostic printing.
//! - **API Layer**: `classlang_transpiler::api::{transpile, transpile_project}`,
//!   pure functions with no I/O or process exits.
//!
//! This crate owns everything up to, but not including, a backend's own
//! textual emission — there is no bundled C++/JS code generator. What this
//! binary writes to `--output` is the mid-end handoff artifact (the
//! validated program, its global context summary, and extern metadata) as
//! JSON; a real backend consumes that same data through
//! [`classlang_transpiler::backend::Backend`].

use classlang_transpiler::api::{transpile, transpile_project, Target, TranspileOptions};
use classlang_transpiler::validator::diagnostics::Diagnostic;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "transpile", version, about = "Classlang transpiler frontend/mid-end", long_about = None)]
struct Args {
    /// Input source file(s).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory to write output artifacts into.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Namespace wrapper identifier for the emitted code.
    #[arg(short = 'n', long = "namespace")]
    namespace: Option<String>,

    /// Backend target tag (cpp, js, bytecode).
    #[arg(short = 't', long = "target", default_value = "cpp")]
    target: String,

    /// Emit only the header artifact.
    #[arg(long = "header-only", conflicts_with = "source_only")]
    header_only: bool,

    /// Emit only the source artifact.
    #[arg(long = "source-only")]
    source_only: bool,

    /// Skip semantic validation (still parses).
    #[arg(long = "no-validation")]
    no_validation: bool,

    /// Suppress line-origin markers / source-map generation.
    #[arg(long = "no-line-directives", alias = "no-lines")]
    no_line_directives: bool,

    /// Enable closed-world interface desugaring.
    #[arg(long = "closed-world")]
    closed_world: bool,

    /// Permit executable statements outside any function.
    #[arg(long = "allow-top-level-statements")]
    allow_top_level_statements: bool,

    /// Additional source root for import resolution (repeatable).
    #[arg(long = "source-root")]
    source_roots: Vec<PathBuf>,

    /// Generate host-side VM bridge (bytecode glue) files.
    #[arg(long = "vm-glue")]
    vm_glue: bool,

    /// Directory to write VM glue files into (defaults to `--output`).
    #[arg(long = "vm-glue-dir")]
    vm_glue_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => return handle_parse_error(e),
    };

    run(args)
}

fn handle_parse_error(e: clap::Error) -> ExitCode {
    use clap::error::ErrorKind;
    if matches!(
        e.kind(),
        ErrorKind::UnknownArgument | ErrorKind::InvalidSubcommand
    ) {
        if let Some(bad) = e
            .context()
            .find(|(kind, _)| *kind == clap::error::ContextKind::InvalidArg)
            .map(|(_, v)| v.to_string())
        {
            eprintln!("Unknown option: {bad}");
            return ExitCode::FAILURE;
        }
    }
    let _ = e.print();
    if e.exit_code() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Expands any directory among the positional inputs into its `.tx` files,
/// walked depth-first and sorted for a deterministic compile order.
fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(input)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file() && e.path().extension().map(|ext| ext == "tx").unwrap_or(false))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            out.extend(found);
        } else {
            out.push(input.clone());
        }
    }
    out
}

fn run(args: Args) -> ExitCode {
    let inputs = expand_inputs(&args.inputs);
    let target: Target = match args.target.parse() {
        Ok(t) => t,
        Err(msg) => {
            eprintln!("Unknown option: --target {} ({msg})", args.target);
            return ExitCode::FAILURE;
        }
    };

    let options = TranspileOptions {
        target,
        namespace: args.namespace.clone(),
        include_headers: Vec::new(),
        output_header: !args.source_only,
        output_source: !args.header_only,
        validate: !args.no_validation,
        emit_line_directives: !args.no_line_directives,
        allow_top_level_statements: args.allow_top_level_statements,
        source_roots: args.source_roots.clone(),
        closed_world: args.closed_world,
    };

    let (all_errors, artifacts): (Vec<Diagnostic>, Vec<(String, serde_json::Value)>) = if inputs.len() == 1
        && args.source_roots.is_empty()
    {
        let path = &inputs[0];
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: cannot read '{}': {e}", path.display());
                return ExitCode::FAILURE;
            }
        };
        let basename = basename_of(path);
        let result = transpile(&source, &path.to_string_lossy(), &options);
        let errors = result.errors.clone();
        let artifact = render_artifact(&result.program, &result.global_context, &result.extern_metadata, &options);
        (errors, vec![(basename, artifact)])
    } else {
        let result = transpile_project(&inputs, &options);
        let errors = result.errors.clone();
        let basename = inputs
            .first()
            .map(|p| basename_of(p))
            .unwrap_or_else(|| "project".to_string());
        let artifact = render_artifact(&result.program, &result.global_context, &result.extern_metadata, &options);
        (errors, vec![(basename, artifact)])
    };

    print_diagnostics(&all_errors);

    // With `--no-validation`, `all_errors` only ever holds parse/desugar
    // errors (the validator never ran), so this still only fails a run
    // that genuinely couldn't be parsed.
    if all_errors.iter().any(Diagnostic::is_error) {
        return ExitCode::FAILURE;
    }

    if let Some(output_dir) = &args.output {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            eprintln!("error: cannot create '{}': {e}", output_dir.display());
            return ExitCode::FAILURE;
        }
        for (basename, artifact) in &artifacts {
            let path = output_dir.join(format!("{basename}.mid.json"));
            if let Err(e) = write_json(&path, artifact) {
                eprintln!("error: cannot write '{}': {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
        if args.vm_glue {
            let glue_dir = args.vm_glue_dir.as_ref().unwrap_or(output_dir);
            if let Err(e) = std::fs::create_dir_all(glue_dir) {
                eprintln!("error: cannot create '{}': {e}", glue_dir.display());
                return ExitCode::FAILURE;
            }
            let stub = classlang_transpiler::backend::BytecodeArtifact::default();
            let path = glue_dir.join("vm_glue.json");
            if let Err(e) = write_json(&path, &serde_json::to_value(&stub).unwrap()) {
                eprintln!("error: cannot write '{}': {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn basename_of(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string())
}

fn render_artifact(
    program: &classlang_transpiler::ast::Program,
    ctx: &classlang_transpiler::validator::GlobalContext,
    extern_metadata: &[classlang_transpiler::extern_meta::ExternClassMeta],
    options: &TranspileOptions,
) -> serde_json::Value {
    serde_json::json!({
        "namespace": options.namespace,
        "target": format!("{:?}", options.target),
        "program": program,
        "discriminants": ctx.discriminants.keys().collect::<Vec<_>>(),
        "externClasses": extern_metadata.iter().map(|m| m.name.clone()).collect::<Vec<_>>(),
    })
}

fn write_json(path: &std::path::Path, value: &serde_json::Value) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(serde_json::to_string_pretty(value)?.as_bytes())
}

/// Prints each diagnostic on its own line, colored when stderr is a tty
/// (§6 "The CLI prints each diagnostic on its own line").
fn print_diagnostics(diagnostics: &[Diagnostic]) {
    use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

    let choice = if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stderr = StandardStream::stderr(choice);
    for d in diagnostics {
        let color = if d.is_error() { Color::Red } else { Color::Yellow };
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)));
        let _ = writeln!(stderr, "{d}");
        let _ = stderr.reset();
    }
    if !diagnostics.is_empty() {
        let width = terminal_size::terminal_size()
            .map(|(terminal_size::Width(w), _)| w as usize)
            .unwrap_or(80)
            .min(120);
        let _ = writeln!(stderr, "{}", "-".repeat(width));
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let warnings = diagnostics.len() - errors;
        let _ = writeln!(stderr, "{errors} error(s), {warnings} warning(s)");
    }
}
