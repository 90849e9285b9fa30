//! Command/response framing.
//!
//! The accumulated output of a command starts with the shell's echo of
//! the command line and ends with the line holding the prompt. Two
//! conventions exist for what sits between them.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Marker of the padded convention: a blank line after the echo.
const PADDED_MARKER: &str = "\r\n\r\n";

/// Strategy for stripping the echo and prompt lines from command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Drop everything up to the first newline and from the last newline.
    Plain,
    /// The echo is followed by a blank line (`\r\n\r\n`) and the output by
    /// a trailing blank line before the prompt.
    Padded,
    /// Pick [`Framing::Padded`] when the output contains `\r\n\r\n`,
    /// otherwise [`Framing::Plain`].
    ///
    /// This is a heuristic: a plain-framed result whose body happens to
    /// contain a blank line is misclassified. Pin a strategy when the
    /// table family is known.
    #[default]
    Detect,
}

impl Framing {
    /// Parses a strategy name (`plain`, `padded`, `detect`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "plain" => Some(Self::Plain),
            "padded" => Some(Self::Padded),
            "detect" | "auto" => Some(Self::Detect),
            _ => None,
        }
    }

    /// Resolves [`Framing::Detect`] against the output it will strip.
    #[must_use]
    pub fn resolve(self, output: &str) -> Self {
        match self {
            Self::Detect => {
                let chosen = if output.contains(PADDED_MARKER) {
                    Self::Padded
                } else {
                    Self::Plain
                };
                debug!(?chosen, "framing detected from output");
                chosen
            }
            other => other,
        }
    }

    /// Strips the echo and prompt lines, returning the interior text.
    ///
    /// Never fails: output too short to hold both framing lines yields an
    /// empty string.
    #[must_use]
    pub fn strip(self, output: &str) -> &str {
        let Some(last_newline) = output.rfind('\n') else {
            return "";
        };

        let (start, end) = match self.resolve(output) {
            Self::Padded => {
                let start = output
                    .find(PADDED_MARKER)
                    .map_or(0, |i| i + PADDED_MARKER.len());
                // Drop the blank line that precedes the prompt line.
                let head = &output[..last_newline];
                let end = head
                    .strip_suffix("\r\n\r")
                    .or_else(|| head.strip_suffix('\r'))
                    .unwrap_or(head)
                    .len();
                (start, end)
            }
            _ => (output.find('\n').map_or(0, |i| i + 1), last_newline),
        };

        if start >= end { "" } else { &output[start..end] }
    }
}
