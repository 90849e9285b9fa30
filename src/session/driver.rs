//! Prompt-framed command execution over a single shell stream.

use crate::error::SessionError;
use crate::session::framing::Framing;
use crate::session::transport::{ReadStatus, Transport};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default prompt of the appliance admin CLI.
pub const DEFAULT_PROMPT: &str = "admin:";

/// Default wait for the prompt, both at connect and per command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time allowed for the command echo before prompt search starts.
pub const DEFAULT_ECHO_GRACE: Duration = Duration::from_secs(1);

/// Default read buffer size.
pub const DEFAULT_READ_BUFFER: usize = 64 * 1024;

/// Upper bound on a single read so deadlines are checked regularly.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Substring the shell prints when it is ready for input.
    pub prompt: String,
    /// Deadline for the prompt, measured from the start of each operation.
    pub timeout: Duration,
    /// How long the command echo may take before prompt search starts at
    /// the beginning of the output.
    pub echo_grace: Duration,
    /// Whether the transport should reject unknown host keys.
    pub strict_host_key: bool,
    /// How the echo and prompt lines are stripped.
    pub framing: Framing,
    /// Size of the read buffer.
    pub read_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            echo_grace: DEFAULT_ECHO_GRACE,
            strict_host_key: false,
            framing: Framing::Detect,
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the echo grace period.
    #[must_use]
    pub const fn with_echo_grace(mut self, echo_grace: Duration) -> Self {
        self.echo_grace = echo_grace;
        self
    }

    /// Sets strict host key verification.
    #[must_use]
    pub const fn with_strict_host_key(mut self, strict: bool) -> Self {
        self.strict_host_key = strict;
        self
    }

    /// Sets the framing strategy.
    #[must_use]
    pub const fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.is_empty() {
            return Err("prompt must not be empty".to_string());
        }
        if self.timeout.is_zero() {
            return Err("timeout must be > 0".to_string());
        }
        if self.read_buffer == 0 {
            return Err("read buffer must be > 0".to_string());
        }
        Ok(())
    }
}

/// An established shell session.
///
/// Commands must be issued serially: prompt framing cannot tell
/// interleaved responses apart. The session never closes its transport;
/// dropping it (or [`Session::into_transport`]) hands that back to the
/// caller. After a timeout the stream state is unknown and the session
/// should be discarded rather than reused.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
}

impl<T: Transport> Session<T> {
    /// Waits for the initial prompt on an already connected transport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] if `config` does not
    /// validate, [`SessionError::PromptTimeout`] if the prompt does not
    /// appear within the configured timeout, [`SessionError::Closed`] if
    /// the peer hangs up first, or [`SessionError::Transport`] on a read
    /// failure.
    pub fn connect(mut transport: T, config: SessionConfig) -> Result<Self, SessionError> {
        config
            .validate()
            .map_err(|reason| SessionError::InvalidConfig {
                host: transport.peer().to_string(),
                reason,
            })?;

        info!(
            peer = transport.peer(),
            timeout_secs = config.timeout.as_secs_f64(),
            "waiting for initial CLI prompt"
        );

        let started = Instant::now();
        let deadline = started.checked_add(config.timeout);
        let prompt = config.prompt.as_bytes();
        let mut buf = vec![0u8; config.read_buffer];
        let mut output = Vec::new();
        let mut scanned = 0;

        loop {
            if scan(&output, prompt, &mut scanned) {
                debug!(
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "initial prompt detected"
                );
                return Ok(Self { transport, config });
            }
            if !read_until(&mut transport, &mut buf, &mut output, deadline)? {
                warn!(peer = transport.peer(), "initial prompt not seen");
                return Err(SessionError::PromptTimeout {
                    host: transport.peer().to_string(),
                    prompt: config.prompt,
                    timeout: config.timeout,
                });
            }
        }
    }

    /// Sends one command line and returns the text printed before the
    /// prompt reappears, with the echo and prompt lines stripped.
    ///
    /// `command` must not contain the prompt string.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CommandTimeout`] if the prompt does not
    /// reappear within the timeout. A remote failure and a slow command are
    /// indistinguishable here.
    pub fn execute(&mut self, command: &str) -> Result<String, SessionError> {
        debug!(peer = self.transport.peer(), command, "sending command");

        let started = Instant::now();
        let deadline = started.checked_add(self.config.timeout);

        self.transport
            .write_all(format!("{command}\n").as_bytes())
            .map_err(|e| self.transport_error(&e))?;

        let prompt = self.config.prompt.as_bytes();
        let mut buf = vec![0u8; self.config.read_buffer];
        let mut output = Vec::new();
        // Prompt search begins after the echo line so a prompt redrawn
        // with the echo is not taken as completion.
        let mut search_from = None;
        let mut echo_scanned = 0;

        loop {
            if search_from.is_none() {
                if let Some(i) = output[echo_scanned..].iter().position(|&b| b == b'\n') {
                    search_from = Some(echo_scanned + i + 1);
                } else if started.elapsed() >= self.config.echo_grace {
                    search_from = Some(0);
                } else {
                    echo_scanned = output.len();
                }
            }
            if let Some(from) = search_from.as_mut()
                && scan(&output, prompt, from)
            {
                break;
            }
            if !read_until(&mut self.transport, &mut buf, &mut output, deadline)? {
                warn!(peer = self.transport.peer(), command, "command prompt not seen");
                return Err(SessionError::CommandTimeout {
                    host: self.transport.peer().to_string(),
                    command: command.to_string(),
                    timeout: self.config.timeout,
                });
            }
        }

        debug!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            bytes = output.len(),
            "command completed"
        );

        let text = String::from_utf8_lossy(&output);
        Ok(self.config.framing.strip(&text).to_string())
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Gives the transport back to the caller.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn transport_error(&self, err: &std::io::Error) -> SessionError {
        SessionError::Transport {
            host: self.transport.peer().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Performs one bounded read, appending to `output`.
///
/// Returns `Ok(false)` once `deadline` has passed. `None` is a timeout
/// beyond the clock's range and never expires.
fn read_until<T: Transport>(
    transport: &mut T,
    buf: &mut [u8],
    output: &mut Vec<u8>,
    deadline: Option<Instant>,
) -> Result<bool, SessionError> {
    let wait = match deadline {
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            (deadline - now).min(POLL_INTERVAL)
        }
        None => POLL_INTERVAL,
    };

    match transport.read_chunk(buf, wait) {
        Ok(ReadStatus::Data(n)) => {
            output.extend_from_slice(&buf[..n]);
            Ok(true)
        }
        Ok(ReadStatus::Idle) => Ok(true),
        Ok(ReadStatus::Closed) => Err(SessionError::Closed {
            host: transport.peer().to_string(),
        }),
        Err(e) => Err(SessionError::Transport {
            host: transport.peer().to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Searches `haystack` for `needle` starting at `*from`.
///
/// On a miss, `*from` moves to the first offset that could still begin a
/// match once more bytes arrive, so each byte is scanned a bounded number
/// of times.
fn scan(haystack: &[u8], needle: &[u8], from: &mut usize) -> bool {
    if contains(&haystack[*from..], needle) {
        return true;
    }
    let tail = haystack
        .len()
        .saturating_sub(needle.len().saturating_sub(1));
    *from = (*from).max(tail);
    false
}

/// Substring search over raw bytes, so a prompt split across reads or
/// next to an incomplete UTF-8 sequence is still found.
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
