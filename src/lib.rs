//! # vos-shell
//!
//! Automation for the interactive admin CLI of collaboration appliances.
//!
//! The appliances expose a line-mode shell whose only framing marker is a
//! recurring prompt (`admin:`). This crate drives that shell over any byte
//! stream and turns the fixed-width tables printed by SQL queries back into
//! rows.
//!
//! ## Features
//!
//! - **Session driver**: prompt handshake, serial command execution, echo
//!   and prompt stripping, deadline-bounded reads
//! - **Transports**: ssh client process, raw TCP, scripted in-memory peer
//! - **Table decoder**: column layout from separator lines, CSV rendering
//! - **Queries**: call-manager and unity database dispatch

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod error;
pub mod io;
pub mod logging;
pub mod query;
pub mod session;
pub mod table;

// Re-export commonly used types at crate root
pub use error::{DecodeError, Error, Result, SessionError};

// Re-export session types
pub use session::{
    Framing, MemoryTransport, ProcessTransport, Session, SessionConfig, SshCommand, TcpTransport,
    Transport,
};

// Re-export table types
pub use table::{
    ColumnLayout, LayoutOptions, Record, TableFamily, TrailingColumn, decode, decode_table,
    derive_layout, parse_csv, render_csv,
};

// Re-export query types
pub use query::{Database, QueryFormat, QueryOutput, run_query};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
