//! Interactive session driver.
//!
//! Drives a line-mode remote shell whose only framing marker is a
//! recurring prompt string:
//!
//! - **transport**: byte streams the driver reads from and writes to
//! - **framing**: stripping of the command echo and trailing prompt
//! - **driver**: prompt handshake and serial command execution

pub mod driver;
pub mod framing;
pub mod transport;

pub use driver::{
    DEFAULT_ECHO_GRACE, DEFAULT_PROMPT, DEFAULT_READ_BUFFER, DEFAULT_TIMEOUT, Session,
    SessionConfig,
};
pub use framing::Framing;
pub use transport::{
    MemoryTransport, ProcessTransport, ReadStatus, SshCommand, Step, TcpTransport, Transport,
};
