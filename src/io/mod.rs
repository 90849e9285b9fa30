//! I/O utilities for vos-shell.
//!
//! Reads captured command output for offline decoding.

pub mod reader;

pub use reader::{read_file, read_input, read_stdin};
