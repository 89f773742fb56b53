//! ARNm compiler driver.
//!
//! `arnmc [flags] <source.arnm>` — diagnostics go to stderr, emissions to
//! stdout; exit code 0 only when every requested stage succeeded.

mod dump;

use arnm_ir::SharedInterner;
use std::process::ExitCode;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Default)]
struct Options {
    source_file: Option<String>,
    dump_tokens: bool,
    dump_ast: bool,
    check_only: bool,
    emit_ir: bool,
    emit_llvm: bool,
    emit_asm: bool,
}

fn print_usage(program: &str) {
    println!("Usage: {program} [options] <source.arnm>");
    println!();
    println!("Options:");
    println!("  --dump-tokens   Print token stream");
    println!("  --dump-ast      Print AST structure");
    println!("  --check         Run semantic analysis only");
    println!("  --emit-ir       Emit SSA intermediate representation");
    println!("  --emit-llvm     Emit LLVM IR (.ll)");
    println!("  --emit-asm      Emit x86-64 assembly (.s)");
    println!("  --help          Show this help");
}

fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut opts = Options::default();
    for arg in &args[1..] {
        match arg.as_str() {
            "--help" => return Ok(None),
            "--dump-tokens" => opts.dump_tokens = true,
            "--dump-ast" => opts.dump_ast = true,
            "--check" => opts.check_only = true,
            "--emit-ir" => opts.emit_ir = true,
            "--emit-llvm" => opts.emit_llvm = true,
            "--emit-asm" => opts.emit_asm = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{other}'"));
            }
            path => opts.source_file = Some(path.to_owned()),
        }
    }
    Ok(Some(opts))
}

/// Install the tracing subscriber; `ARNM_LOG` selects the filter
/// (e.g. `ARNM_LOG=arnm_sema=debug`).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("ARNM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("arnmc", String::as_str);

    if args.len() < 2 {
        print_usage(program);
        return ExitCode::FAILURE;
    }

    let opts = match parse_args(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            print_usage(program);
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let Some(source_file) = opts.source_file else {
        eprintln!("error: no source file specified");
        return ExitCode::FAILURE;
    };

    let source = match std::fs::read_to_string(&source_file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: could not open file '{source_file}': {err}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("ARNm Compiler v{VERSION}");
    eprintln!("Compiling: {source_file} ({} bytes)", source.len());
    eprintln!();

    let interner = SharedInterner::new();

    if opts.dump_tokens {
        dump::print_tokens(&source, interner.clone());
        println!();
    }

    // Parse.
    let parsed = arnm_parse::parse(&source, interner.clone());
    if parsed.had_error() {
        eprintln!("Parse errors:");
        for diag in parsed.diagnostics.iter() {
            eprintln!("  {diag}");
        }
        if parsed.diagnostics.dropped() > 0 {
            eprintln!("  ... and {} more", parsed.diagnostics.dropped());
        }
        return ExitCode::FAILURE;
    }
    eprintln!(
        "Parse successful: {} declarations",
        parsed.program.decls.len()
    );

    if opts.dump_ast {
        println!();
        dump::print_ast(&parsed.program, &parsed.arena, &interner);
    }

    // Semantic analysis.
    let analysis = arnm_sema::analyze(&parsed.program, &parsed.arena, interner.clone());
    if analysis.had_error() {
        eprintln!();
        eprintln!("Semantic errors:");
        for diag in analysis.diagnostics.iter() {
            eprintln!("  {diag}");
        }
        return ExitCode::FAILURE;
    }
    eprintln!(
        "Semantic analysis: OK ({} symbols)",
        analysis.symbols.symbol_count()
    );

    if opts.check_only {
        eprintln!();
        eprintln!("Check complete. No errors.");
        return ExitCode::SUCCESS;
    }

    // Lower to IR and emit whatever was requested.
    let module = arnm_lower::lower(&parsed.program, &parsed.arena, &analysis, interner.clone());

    if opts.emit_ir {
        eprintln!();
        eprintln!("--- ARNm IR ---");
        print!("{}", module.dump(&interner));
    }
    if opts.emit_llvm {
        eprintln!();
        eprintln!("--- LLVM IR ---");
        print!("{}", arnm_codegen::emit_llvm(&module, &interner));
    }
    if opts.emit_asm {
        eprintln!();
        eprintln!("--- x86-64 Assembly ---");
        print!("{}", arnm_codegen::emit_x86_64(&module, &interner));
    }

    ExitCode::SUCCESS
}
