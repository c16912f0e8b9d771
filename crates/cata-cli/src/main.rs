//! `catac` - the cata compiler driver.
//!
//! Consumes a serialised AST (the parser is a separate tool), runs the
//! semantic core, renders diagnostics, optionally writes a bundle, and
//! optionally executes `main` through the module evaluator.
//!
//! Exit codes: 0 success, 1 compilation failed, 2 not runnable / missing
//! entry point.

mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cata_ast::TranslationUnit;
use cata_codegen::{compile, run_main, CompileSession};
use cata_llir::eval::RtVal;

use crate::args::CliArgs;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    match drive(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn drive(args: &CliArgs) -> Result<ExitCode> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let mut tu: TranslationUnit =
        serde_json::from_str(&text).context("input is not a serialised translation unit")?;

    let module_name = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let session = compile(&mut tu, &module_name);

    let diagnostics = session.render_diagnostics(&tu.source, args.format.into());
    if !diagnostics.is_empty() {
        eprint!("{diagnostics}");
    }

    if args.print_ir {
        print!("{}", session.state.builder.module.print_to_string());
    }

    if !session.is_successful {
        return Ok(ExitCode::from(1));
    }

    if let Some(output) = &args.output {
        cata_bundle::write_bundle_file(output, &session.state, &args.arch)?;
    }

    if args.run {
        return run_and_report(&session);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_and_report(session: &CompileSession) -> Result<ExitCode> {
    if !session.is_runnable {
        println!("Error: entry point `main` not found or not a function.");
        return Ok(ExitCode::from(2));
    }
    let result = run_main(session).context("execution failed")?;
    println!(
        "Result: <{}> {}",
        session.result_type_name,
        format_result(&session.result_type_name, result)
    );
    Ok(ExitCode::SUCCESS)
}

fn format_result(type_name: &str, value: RtVal) -> String {
    match type_name {
        "i8" => format!("{}", value.as_signed(8)),
        "i16" => format!("{}", value.as_signed(16)),
        "i32" => format!("{}", value.as_signed(32)),
        "i64" | "isize" => format!("{}", value.as_signed(64)),
        "i128" => format!("{}", value.as_signed(128)),
        "u8" | "u16" | "u32" | "u64" | "u128" | "usize" => format!("{}", value.as_int()),
        "f16" | "f32" | "f64" | "f80" | "f128" => format!("{}", value.as_float()),
        "bool" => format!("{}", value.as_int() != 0),
        "void" => "()".to_string(),
        _ => format!("{:#x}", value.as_int()),
    }
}
