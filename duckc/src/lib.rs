//! Compiler from Duckyscript to the bytecode the uberducky firmware plays.

pub mod compiler;
pub mod output;

pub use compiler::{compile, CompileError};
pub use output::Format;
