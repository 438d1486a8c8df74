use std::path::Path;

use anyhow::Context;
use clap::Parser;

/// A destination-driven compiler from S-expressions to Z80 assembly
#[derive(Parser, Debug)]
#[command(version = "0", about = "Compile an S-expression program to Z80 assembly")]
struct Cli {
    /// Path to a source file, or a literal program when no such file exists
    program: String,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let source = if Path::new(&args.program).is_file() {
        std::fs::read_to_string(&args.program)
            .context(format!("Unable to read source file: {:?}", args.program))?
    } else {
        args.program.clone()
    };
    let listing = zedc::compile(&source)?;
    print!("{listing}");
    Ok(())
}
