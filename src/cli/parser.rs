//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::error::{CommandError, Error, Result};
use crate::query::CALL_MANAGER_DB;
use crate::session::{DEFAULT_PROMPT, Framing, SessionConfig};
use crate::table::{DEFAULT_SAMPLE_LINES, LayoutOptions, TrailingColumn};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// vos-shell: run admin CLI commands and SQL queries on collaboration
/// appliances.
///
/// Drives the appliance's interactive admin shell and decodes the
/// fixed-width tables it prints into rows, CSV or JSON.
#[derive(Parser, Debug)]
#[command(name = "vos-shell")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// CLI prompt that marks the end of command output.
    #[arg(long, env = "VOS_PROMPT", default_value = DEFAULT_PROMPT, global = true)]
    pub prompt: String,

    /// Seconds to wait for the prompt.
    #[arg(long, env = "VOS_TIMEOUT", default_value = "60", global = true)]
    pub timeout: u64,

    /// Milliseconds allowed for the command echo before prompt search.
    #[arg(long, default_value = "1000", global = true)]
    pub echo_grace_ms: u64,

    /// Output framing (plain, padded, detect).
    #[arg(long, default_value = "detect", global = true)]
    pub framing: String,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, csv, raw).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// How to reach the target appliances.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Target host. Repeat to run against several hosts in parallel.
    #[arg(short = 'H', long = "host", required = true)]
    pub hosts: Vec<String>,

    /// Port (ssh default 22; required with --tcp).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Login name passed to ssh.
    #[arg(short, long, env = "VOS_USER")]
    pub user: Option<String>,

    /// Connect with a raw TCP stream instead of ssh.
    #[arg(long)]
    pub tcp: bool,

    /// ssh client program.
    #[arg(long, default_value = "ssh")]
    pub ssh_program: String,

    /// Reject unknown or changed host keys.
    #[arg(long)]
    pub strict_host_key: bool,

    /// Extra ssh `-o` option (repeatable).
    #[arg(short = 'o', long = "ssh-option")]
    pub ssh_options: Vec<String>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one admin CLI command and print its output.
    Exec {
        /// Target selection.
        #[command(flatten)]
        target: TargetArgs,

        /// Command line, e.g. `show status`.
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Run a SQL query and print the decoded rows.
    Sql {
        /// Target selection.
        #[command(flatten)]
        target: TargetArgs,

        /// Database: `ccm`, or the name of a unity database.
        #[arg(long, default_value = CALL_MANAGER_DB)]
        db: String,

        /// Query text.
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Decode captured query output from a file or stdin.
    Decode {
        /// Input file (stdin if omitted or `-`).
        file: Option<PathBuf>,

        /// Database the output came from; selects the layout preset.
        #[arg(long, default_value = CALL_MANAGER_DB)]
        db: String,

        /// Column break token (overrides the preset).
        #[arg(long)]
        token: Option<String>,

        /// Characters a separator line may start with (overrides the preset).
        #[arg(long)]
        markers: Option<String>,

        /// Trailing column policy: always, never, auto (overrides the preset).
        #[arg(long)]
        trailing: Option<String>,

        /// Lines searched for the separator.
        #[arg(long, default_value_t = DEFAULT_SAMPLE_LINES)]
        sample_lines: usize,
    },
}

impl Cli {
    /// Builds the session configuration from the global options.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown framing name or invalid values.
    pub fn session_config(&self, strict_host_key: bool) -> Result<SessionConfig> {
        let framing = Framing::parse(&self.framing).ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "--framing {} (expected plain, padded or detect)",
                self.framing
            ))
        })?;

        let config = SessionConfig::new()
            .with_prompt(self.prompt.clone())
            .with_timeout(Duration::from_secs(self.timeout))
            .with_echo_grace(Duration::from_millis(self.echo_grace_ms))
            .with_strict_host_key(strict_host_key)
            .with_framing(framing);

        config
            .validate()
            .map_err(|message| Error::Config { message })?;
        Ok(config)
    }
}

/// Applies `decode` overrides on top of a preset.
///
/// # Errors
///
/// Returns an error for an unknown trailing policy.
pub fn layout_overrides(
    mut options: LayoutOptions,
    token: Option<&str>,
    markers: Option<&str>,
    trailing: Option<&str>,
    sample_lines: usize,
) -> Result<LayoutOptions> {
    if let Some(token) = token {
        options = options.with_break_token(token);
    }
    if let Some(markers) = markers {
        options = options.with_markers(markers.chars());
    }
    if let Some(trailing) = trailing {
        let policy = TrailingColumn::parse(trailing).ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "--trailing {trailing} (expected always, never or auto)"
            ))
        })?;
        options = options.with_trailing(policy);
    }
    Ok(options.with_sample_lines(sample_lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exec_args() {
        let cli = parse(&[
            "vos-shell",
            "exec",
            "-H",
            "cucm-pub",
            "-H",
            "cucm-sub",
            "-u",
            "admin",
            "show",
            "status",
        ]);
        let Commands::Exec { target, command } = cli.command else {
            unreachable!("exec parsed");
        };
        assert_eq!(target.hosts, vec!["cucm-pub", "cucm-sub"]);
        assert_eq!(target.user.as_deref(), Some("admin"));
        assert_eq!(command.join(" "), "show status");
    }

    #[test]
    fn test_sql_defaults_to_ccm() {
        let cli = parse(&["vos-shell", "sql", "-H", "cucm", "select", "name", "from", "device"]);
        let Commands::Sql { db, query, .. } = cli.command else {
            unreachable!("sql parsed");
        };
        assert_eq!(db, "ccm");
        assert_eq!(query.join(" "), "select name from device");
    }

    #[test]
    fn test_session_config_from_globals() {
        let cli = parse(&[
            "vos-shell",
            "--prompt",
            "cuc:",
            "--timeout",
            "5",
            "--framing",
            "padded",
            "decode",
        ]);
        let config = cli.session_config(true).unwrap();
        assert_eq!(config.prompt, "cuc:");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.framing, Framing::Padded);
        assert!(config.strict_host_key);
    }

    #[test]
    fn test_session_config_rejects_bad_framing() {
        let cli = parse(&["vos-shell", "--framing", "crlf", "decode"]);
        assert!(cli.session_config(false).is_err());
    }

    #[test]
    fn test_session_config_rejects_zero_timeout() {
        let cli = parse(&["vos-shell", "--timeout", "0", "decode"]);
        assert!(matches!(
            cli.session_config(false),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_layout_overrides() {
        let options = layout_overrides(
            LayoutOptions::default(),
            Some(" "),
            Some("="),
            Some("never"),
            5,
        )
        .unwrap();
        assert_eq!(options.break_token, " ");
        assert_eq!(options.markers, vec!['=']);
        assert_eq!(options.trailing, TrailingColumn::Never);
        assert_eq!(options.sample_lines, 5);

        assert!(
            layout_overrides(LayoutOptions::default(), None, None, Some("sometimes"), 3).is_err()
        );
    }
}
