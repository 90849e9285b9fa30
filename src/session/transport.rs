//! Byte-stream transports for the session driver.
//!
//! The driver never assumes anything about message segmentation: a
//! transport hands back whatever bytes are available, waiting at most the
//! time it is given. Authentication and transport security belong to the
//! transport (or the external client it wraps), not to the driver.

use crate::error::SessionError;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Size of the pump thread's read buffer for process transports.
const PUMP_BUFFER_SIZE: usize = 8192;

/// Outcome of a single bounded read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes were placed at the start of the buffer.
    Data(usize),
    /// Nothing arrived within the wait.
    Idle,
    /// The peer closed the stream.
    Closed,
}

/// A bidirectional byte stream to a remote line-mode shell.
pub trait Transport {
    /// Reads available bytes into `buf`, waiting at most `wait`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for anything other than a timeout.
    fn read_chunk(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<ReadStatus>;

    /// Writes all of `data` to the stream.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Label of the remote peer, used in error messages.
    fn peer(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_chunk(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<ReadStatus> {
        (**self).read_chunk(buf, wait)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn peer(&self) -> &str {
        (**self).peer()
    }
}

// ==================== TCP ====================

/// A raw TCP stream to a shell that needs no further handshake.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
}

impl TcpTransport {
    /// Connects to `host:port`, giving up after `connect_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectFailure`] if the address does not
    /// resolve or no address accepts the connection in time.
    pub fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Self, SessionError> {
        let failure = |reason: String| SessionError::ConnectFailure {
            host: host.to_string(),
            reason,
        };

        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| failure(e.to_string()))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => {
                    debug!(%addr, "tcp transport connected");
                    return Self::from_stream(stream, host).map_err(|e| failure(e.to_string()));
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(failure(last_error.map_or_else(
            || "address resolved to nothing".to_string(),
            |e| e.to_string(),
        )))
    }

    /// Wraps an already connected stream.
    ///
    /// # Errors
    ///
    /// Returns an error if `TCP_NODELAY` cannot be set.
    pub fn from_stream(stream: TcpStream, peer: &str) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            peer: peer.to_string(),
        })
    }
}

impl Transport for TcpTransport {
    fn read_chunk(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<ReadStatus> {
        // A zero read timeout means "block forever" to the socket layer.
        self.stream
            .set_read_timeout(Some(wait.max(Duration::from_millis(1))))?;
        match self.stream.read(buf) {
            Ok(0) => Ok(ReadStatus::Closed),
            Ok(n) => Ok(ReadStatus::Data(n)),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(ReadStatus::Idle)
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

// ==================== External process ====================

/// A shell reached through an external client process, normally `ssh`.
///
/// Stdout is drained by a pump thread into a channel so reads can wait
/// with a deadline. Dropping the transport kills the child.
#[derive(Debug)]
pub struct ProcessTransport {
    child: Child,
    stdin: ChildStdin,
    output: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pump: Option<JoinHandle<()>>,
    peer: String,
}

impl ProcessTransport {
    /// Spawns `command` with piped stdin/stdout. Stderr is inherited so
    /// the client's own diagnostics and password prompts reach the user.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectFailure`] if the process cannot be
    /// started.
    pub fn spawn(mut command: Command, peer: &str) -> Result<Self, SessionError> {
        let failure = |reason: String| SessionError::ConnectFailure {
            host: peer.to_string(),
            reason,
        };

        let program = command.get_program().to_string_lossy().to_string();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| failure(format!("failed to start {program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| failure("child stdin unavailable".to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| failure("child stdout unavailable".to_string()))?;

        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let pump = thread::spawn(move || {
            let mut buffer = vec![0u8; PUMP_BUFFER_SIZE];
            loop {
                match stdout.read(&mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buffer[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        debug!(peer, pid = child.id(), "process transport started");

        Ok(Self {
            child,
            stdin,
            output: rx,
            pending: Vec::new(),
            pump: Some(pump),
            peer: peer.to_string(),
        })
    }

    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }
}

impl Transport for ProcessTransport {
    fn read_chunk(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<ReadStatus> {
        if !self.pending.is_empty() {
            return Ok(ReadStatus::Data(self.drain_pending(buf)));
        }
        match self.output.recv_timeout(wait) {
            Ok(data) => {
                self.pending = data;
                Ok(ReadStatus::Data(self.drain_pending(buf)))
            }
            Err(RecvTimeoutError::Timeout) => Ok(ReadStatus::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(ReadStatus::Closed),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stdin.write_all(data)?;
        self.stdin.flush()
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

/// Builder for the `ssh` invocation that reaches an appliance shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCommand {
    /// Remote host (hostname or IP).
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login name, if not taken from the client's own configuration.
    pub user: Option<String>,
    /// Client program to run.
    pub program: String,
    /// Reject unknown or changed host keys.
    pub strict_host_key: bool,
    /// Additional `-o` options (e.g. `ConnectTimeout=10`).
    pub extra_options: Vec<String>,
}

impl SshCommand {
    /// Creates a command for `host` with default port and client.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: None,
            program: "ssh".to_string(),
            strict_host_key: false,
            extra_options: Vec::new(),
        }
    }

    /// Sets the login name.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the client program.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Enables or disables strict host key checking.
    #[must_use]
    pub const fn with_strict_host_key(mut self, strict: bool) -> Self {
        self.strict_host_key = strict;
        self
    }

    /// Adds an extra `-o` option.
    #[must_use]
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.extra_options.push(option.into());
        self
    }

    /// Returns the program arguments.
    ///
    /// `-tt` forces a terminal so the appliance starts its interactive CLI
    /// even though stdin is a pipe.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-tt".to_string(), "-p".to_string(), self.port.to_string()];

        args.push("-o".to_string());
        args.push(format!(
            "StrictHostKeyChecking={}",
            if self.strict_host_key { "yes" } else { "no" }
        ));

        for option in &self.extra_options {
            args.push("-o".to_string());
            args.push(option.clone());
        }

        if let Some(user) = &self.user {
            args.push("-l".to_string());
            args.push(user.clone());
        }

        args.push(self.host.clone());
        args
    }

    /// Builds the process command.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.args());
        command
    }

    /// Spawns the client and wraps it as a transport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectFailure`] if the client cannot start.
    pub fn spawn(&self) -> Result<ProcessTransport, SessionError> {
        ProcessTransport::spawn(self.to_command(), &self.host)
    }
}

// ==================== Scripted ====================

/// One step of a scripted peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Bytes delivered by the next read (split if the buffer is smaller).
    Data(Vec<u8>),
    /// Silence for this long.
    Pause(Duration),
}

/// An in-memory peer that replays a script and records what was written.
///
/// Once the script runs out the peer either stays silent forever or closes
/// the stream, depending on [`MemoryTransport::hold_open`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    script: VecDeque<Step>,
    written: Vec<u8>,
    hold_open: bool,
    peer: String,
}

impl MemoryTransport {
    /// Creates an empty script that closes once exhausted.
    #[must_use]
    pub fn new(peer: &str) -> Self {
        Self {
            script: VecDeque::new(),
            written: Vec::new(),
            hold_open: false,
            peer: peer.to_string(),
        }
    }

    /// Appends output text to the script.
    #[must_use]
    pub fn then_send(mut self, text: &str) -> Self {
        self.script.push_back(Step::Data(text.as_bytes().to_vec()));
        self
    }

    /// Appends a pause to the script.
    #[must_use]
    pub fn then_pause(mut self, pause: Duration) -> Self {
        self.script.push_back(Step::Pause(pause));
        self
    }

    /// Keeps the stream open (silent) after the script ends.
    #[must_use]
    pub const fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Returns everything written so far.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl Transport for MemoryTransport {
    fn read_chunk(&mut self, buf: &mut [u8], wait: Duration) -> io::Result<ReadStatus> {
        match self.script.front_mut() {
            Some(Step::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                data.drain(..n);
                if data.is_empty() {
                    self.script.pop_front();
                }
                Ok(ReadStatus::Data(n))
            }
            Some(Step::Pause(remaining)) => {
                let slept = (*remaining).min(wait);
                thread::sleep(slept);
                *remaining -= slept;
                if remaining.is_zero() {
                    self.script.pop_front();
                }
                Ok(ReadStatus::Idle)
            }
            None if self.hold_open => {
                thread::sleep(wait);
                Ok(ReadStatus::Idle)
            }
            None => Ok(ReadStatus::Closed),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}
