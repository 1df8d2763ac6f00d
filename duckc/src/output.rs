//! What the compiler writes out.

use std::fmt::Write;

use clap::ValueEnum;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// The bytecode as is
    Bin,
    /// A Rust source file holding the bytecode in a static array
    #[default]
    Rust,
}

const BYTES_PER_LINE: usize = 12;

/// Render a script as `pub static NAME: [u8; N] = [...];`, ready to replace
/// the firmware's built-in script.
pub fn rust_array(script: &[u8], name: &str, source: &str) -> String {
    let mut out = String::new();
    // Writing to a String does not fail
    let _ = writeln!(out, "//! Generated by duckc from {source}.");
    let _ = writeln!(out);
    let _ = writeln!(out, "#[rustfmt::skip]");
    let _ = writeln!(out, "pub static {name}: [u8; {}] = [", script.len());
    for chunk in script.chunks(BYTES_PER_LINE) {
        out.push_str("   ");
        for byte in chunk {
            let _ = write!(out, " 0x{byte:02x},");
        }
        out.push('\n');
    }
    out.push_str("];\n");
    out
}

/// Rust identifiers only; the name ends up as a static.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
