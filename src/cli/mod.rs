//! CLI layer for vos-shell.
//!
//! Provides the command-line interface using clap, with commands for
//! running admin CLI commands, SQL queries, and decoding captured output.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{CommandOutput, execute};
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
