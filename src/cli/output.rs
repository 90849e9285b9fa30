//! Output formatting for CLI commands.
//!
//! Supports text, JSON, CSV and raw output formats.

use crate::error::Error;
use crate::query::QueryOutput;
use crate::table::{Record, render_csv, render_text};
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
    /// CSV output of decoded rows.
    Csv,
    /// Undecoded command output.
    Raw,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "csv" => Self::Csv,
            "raw" => Self::Raw,
            _ => Self::Text,
        }
    }
}

/// Outcome of one host's command.
#[derive(Debug)]
pub struct HostResult {
    /// Target host.
    pub host: String,
    /// Command output or the error that ended it.
    pub result: Result<QueryOutput, Error>,
}

impl HostResult {
    /// Returns whether the command succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Formats per-host results.
///
/// A single host prints its output bare; several hosts get a header per
/// block. Errors are reported inline.
#[must_use]
pub fn format_host_results(results: &[HostResult], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_host_results_json(results),
        _ => format_host_results_text(results, format),
    }
}

fn format_host_results_text(results: &[HostResult], format: OutputFormat) -> String {
    let mut output = String::new();
    let headers = results.len() > 1;

    for result in results {
        if headers {
            let _ = writeln!(output, "== {} ==", result.host);
        }
        match &result.result {
            Ok(query_output) => {
                push_block(&mut output, &format_query_output(query_output, format));
            }
            Err(e) => {
                let _ = writeln!(output, "error: {e}");
            }
        }
    }

    output
}

fn format_host_results_json(results: &[HostResult]) -> String {
    #[derive(Serialize)]
    struct HostJson<'a> {
        host: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<&'a QueryOutput>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    }

    let entries: Vec<HostJson<'_>> = results
        .iter()
        .map(|r| HostJson {
            host: &r.host,
            output: r.result.as_ref().ok(),
            error: r.result.as_ref().err().map(ToString::to_string),
        })
        .collect();
    format_json(&entries)
}

/// Formats a single query output for text-like formats.
#[must_use]
pub fn format_query_output(output: &QueryOutput, format: OutputFormat) -> String {
    match output {
        QueryOutput::Raw(text) | QueryOutput::Csv(text) => text.clone(),
        QueryOutput::Rows(records) => format_records(records, format),
    }
}

/// Formats decoded records.
#[must_use]
pub fn format_records(records: &[Record], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(&records),
        OutputFormat::Csv | OutputFormat::Raw => render_csv(records),
        OutputFormat::Text => render_text(records),
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }
            format_json(&ErrorOutput {
                error: error.to_string(),
            })
        }
        _ => error.to_string(),
    }
}

/// Appends a block, terminating it with a newline if needed.
fn push_block(output: &mut String, block: &str) {
    output.push_str(block);
    if !block.is_empty() && !block.ends_with('\n') {
        output.push('\n');
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
