use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use duckc::{compile, output, Format};

/// Compile a Duckyscript payload for the uberducky
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The Duckyscript source
    input: PathBuf,

    /// Name of the generated static (rust format only)
    #[arg(default_value = "SCRIPT")]
    name: String,

    /// Output format
    #[arg(long, short, value_enum, default_value_t)]
    format: Format,

    /// Where to write the result; stdout when absent
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.format == Format::Rust && !output::is_valid_name(&cli.name) {
        bail!("'{}' is not a valid Rust identifier", cli.name);
    }

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let script = compile(&source).with_context(|| format!("in {}", cli.input.display()))?;
    log::info!("{}: {} bytes", cli.input.display(), script.len());

    let bytes = match cli.format {
        Format::Bin => script,
        Format::Rust => {
            output::rust_array(&script, &cli.name, &cli.input.display().to_string()).into_bytes()
        }
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?
        }
        None => io::stdout().write_all(&bytes)?,
    }

    Ok(())
}
