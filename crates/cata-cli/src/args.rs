use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use cata_common::RenderFormat;

/// CLI arguments for the catac binary.
#[derive(Parser, Debug)]
#[command(name = "catac", version, about = "The cata compiler")]
pub struct CliArgs {
    /// Input translation unit (AST as JSON, produced by the parser).
    pub input: PathBuf,

    /// Diagnostic rendering format.
    #[arg(long, value_enum, default_value = "ascii")]
    pub format: Format,

    /// Optimiser level (accepted for compatibility; the core emits
    /// unoptimised LLIR and leaves optimisation to the backend).
    #[arg(short = 'O', default_value_t = 0)]
    pub optimizer_level: u8,

    /// Execute `main` after a successful compile and print its result.
    #[arg(long)]
    pub run: bool,

    /// Write a bundle (object blob, bitcode, metadata) to this path.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Target triple recorded in the bundle.
    #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
    pub arch: String,

    /// Dump the emitted module to stdout.
    #[arg(long = "print-ir")]
    pub print_ir: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Ascii,
    Color,
    Fancy,
}

impl From<Format> for RenderFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Ascii => RenderFormat::Ascii,
            Format::Color => RenderFormat::Color,
            Format::Fancy => RenderFormat::Fancy,
        }
    }
}
