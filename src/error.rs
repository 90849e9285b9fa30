//! Error types for vos-shell operations.
//!
//! This module provides the error hierarchy using `thiserror` for the
//! session driver, the tabular output decoder, input handling and CLI
//! commands. Every variant carries enough context (host, wait threshold,
//! step) to be shown to an operator verbatim.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for vos-shell operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Remote shell session errors.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Tabular output decoding errors.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O errors (input files, stdin).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Errors raised while establishing or driving a shell session.
///
/// None of these are retried internally. After a timeout the stream is in
/// an unknown state and the session should be discarded.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport or authentication failure before the shell handshake.
    #[error("error connecting to {host}: {reason}")]
    ConnectFailure {
        /// Target host.
        host: String,
        /// Reason for failure.
        reason: String,
    },

    /// The initial prompt was never observed.
    #[error(
        "{} second timer expired waiting for initial CLI prompt {prompt:?} on {host}",
        .timeout.as_secs_f64()
    )]
    PromptTimeout {
        /// Target host.
        host: String,
        /// Prompt that was expected.
        prompt: String,
        /// Wait threshold.
        timeout: Duration,
    },

    /// The prompt did not reappear after a command.
    #[error(
        "{} second timer expired waiting for completion of {command:?} on {host}",
        .timeout.as_secs_f64()
    )]
    CommandTimeout {
        /// Target host.
        host: String,
        /// Command line that was sent.
        command: String,
        /// Wait threshold.
        timeout: Duration,
    },

    /// The peer closed the stream before the prompt appeared.
    #[error("{host} closed the session while waiting for the CLI prompt")]
    Closed {
        /// Target host.
        host: String,
    },

    /// The session configuration cannot drive a handshake.
    #[error("invalid session configuration for {host}: {reason}")]
    InvalidConfig {
        /// Target host.
        host: String,
        /// The rejected setting.
        reason: String,
    },

    /// Read or write failure on an established stream.
    #[error("transport error on {host}: {reason}")]
    Transport {
        /// Target host.
        host: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Errors raised by the tabular output decoder.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// No separator line within the scanned sample.
    #[error("unable to parse result, no separator line within the first {scanned} lines")]
    NoSeparatorFound {
        /// Number of lines that were scanned.
        scanned: usize,
    },

    /// Layout options that cannot describe any table.
    #[error("invalid layout options: {reason}")]
    InvalidOptions {
        /// Reason the options are invalid.
        reason: String,
    },
}

/// I/O-specific errors for reading captured output.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}
