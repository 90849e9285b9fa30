//! Binary entry point for vos-shell.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use vos_shell::cli::output::{OutputFormat, format_error};
use vos_shell::cli::{Cli, execute};
use vos_shell::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let format = OutputFormat::parse(&cli.format);

    match execute(&cli) {
        Ok(output) => {
            if !output.text.is_empty() {
                // Handle broken pipe gracefully (e.g., when piped to `head`)
                if let Err(e) = write!(io::stdout(), "{}", output.text)
                    && e.kind() != io::ErrorKind::BrokenPipe
                {
                    eprintln!("Error writing to stdout: {e}");
                    return ExitCode::FAILURE;
                }
            }
            if output.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            let error_output = format_error(&e, format);
            match format {
                OutputFormat::Json => {
                    // JSON errors go to stdout for programmatic parsing
                    println!("{error_output}");
                }
                _ => {
                    eprintln!("Error: {error_output}");
                }
            }
            ExitCode::FAILURE
        }
    }
}
