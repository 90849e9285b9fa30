//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cli::output::{HostResult, OutputFormat, format_host_results, format_records};
use crate::cli::parser::{Cli, Commands, TargetArgs, layout_overrides};
use crate::error::{CommandError, Result};
use crate::io::read_input;
use crate::query::{Database, QueryFormat, QueryOutput, run_query};
use crate::session::{Session, SessionConfig, SshCommand, TcpTransport, Transport};
use crate::table::{LayoutOptions, decode_table};
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Session over whichever transport the target arguments select.
pub type BoxedSession = Session<Box<dyn Transport + Send>>;

/// Output of a CLI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Formatted output for stdout.
    pub text: String,
    /// Number of hosts whose command failed.
    pub failures: usize,
}

impl CommandOutput {
    /// Returns whether every host succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failures == 0
    }
}

/// Executes the CLI command.
///
/// Per-host failures are reported inline and counted in
/// [`CommandOutput::failures`]; only errors that prevent any host from
/// being tried are returned as `Err`.
///
/// # Errors
///
/// Returns an error for invalid arguments or unreadable decode input.
pub fn execute(cli: &Cli) -> Result<CommandOutput> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Exec { target, command } => {
            let config = cli.session_config(target.strict_host_key)?;
            let line = command.join(" ");
            cmd_exec(target, &config, &line, format)
        }
        Commands::Sql { target, db, query } => {
            let config = cli.session_config(target.strict_host_key)?;
            let sql = query.join(" ");
            cmd_sql(target, &config, &Database::from_name(db), &sql, format)
        }
        Commands::Decode {
            file,
            db,
            token,
            markers,
            trailing,
            sample_lines,
        } => {
            let options = layout_overrides(
                Database::from_name(db).layout_options(),
                token.as_deref(),
                markers.as_deref(),
                trailing.as_deref(),
                *sample_lines,
            )?;
            cmd_decode(file.as_deref(), &options, format)
        }
    }
}

fn cmd_exec(
    target: &TargetArgs,
    config: &SessionConfig,
    line: &str,
    format: OutputFormat,
) -> Result<CommandOutput> {
    let results = for_each_host(target, config, |session| {
        Ok(QueryOutput::Raw(session.execute(line)?))
    })?;
    Ok(report(&results, format))
}

fn cmd_sql(
    target: &TargetArgs,
    config: &SessionConfig,
    db: &Database,
    sql: &str,
    format: OutputFormat,
) -> Result<CommandOutput> {
    let query_format = match format {
        OutputFormat::Raw => QueryFormat::Raw,
        OutputFormat::Csv => QueryFormat::Csv,
        OutputFormat::Text | OutputFormat::Json => QueryFormat::Rows,
    };
    let results = for_each_host(target, config, |session| {
        run_query(session, db, sql, query_format)
    })?;
    Ok(report(&results, format))
}

fn cmd_decode(
    file: Option<&Path>,
    options: &LayoutOptions,
    format: OutputFormat,
) -> Result<CommandOutput> {
    if format == OutputFormat::Raw {
        return Err(CommandError::InvalidArgument(
            "--format raw does not apply to decode (use text, csv or json)".to_string(),
        )
        .into());
    }

    let text = read_input(file)?;
    let records = decode_table(&text, options)?;
    debug!(rows = records.len(), "decoded captured output");

    Ok(CommandOutput {
        text: format_records(&records, format),
        failures: 0,
    })
}

/// Runs `action` on a fresh session per host, in parallel.
///
/// Results keep the order of `--host` arguments.
fn for_each_host<F>(
    target: &TargetArgs,
    config: &SessionConfig,
    action: F,
) -> Result<Vec<HostResult>>
where
    F: Fn(&mut BoxedSession) -> Result<QueryOutput> + Sync,
{
    let route = Route::from_target(target)?;

    let results = target
        .hosts
        .par_iter()
        .map(|host| {
            let result = open_session(target, route, config, host).and_then(|mut session| {
                info!(host = %host, "session ready");
                action(&mut session)
            });
            if let Err(e) = &result {
                warn!(host = %host, error = %e, "host failed");
            }
            HostResult {
                host: host.clone(),
                result,
            }
        })
        .collect();
    Ok(results)
}

/// How every host of a command is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Raw TCP to this port.
    Tcp(u16),
    /// The ssh client, on its default port unless one is given.
    Ssh(Option<u16>),
}

impl Route {
    fn from_target(target: &TargetArgs) -> Result<Self> {
        match (target.tcp, target.port) {
            (true, Some(port)) => Ok(Self::Tcp(port)),
            (true, None) => {
                Err(CommandError::InvalidArgument("--tcp requires --port".to_string()).into())
            }
            (false, port) => Ok(Self::Ssh(port)),
        }
    }
}

/// Opens a transport to `host` and waits for the initial prompt.
fn open_session(
    target: &TargetArgs,
    route: Route,
    config: &SessionConfig,
    host: &str,
) -> Result<BoxedSession> {
    let transport: Box<dyn Transport + Send> = match route {
        Route::Tcp(port) => Box::new(TcpTransport::connect(host, port, config.timeout)?),
        Route::Ssh(port) => Box::new(ssh_command(target, config, host, port).spawn()?),
    };
    Ok(Session::connect(transport, config.clone())?)
}

fn ssh_command(
    target: &TargetArgs,
    config: &SessionConfig,
    host: &str,
    port: Option<u16>,
) -> SshCommand {
    let mut command = SshCommand::new(host)
        .with_program(target.ssh_program.as_str())
        .with_strict_host_key(config.strict_host_key);
    if let Some(port) = port {
        command = command.with_port(port);
    }
    if let Some(user) = &target.user {
        command = command.with_user(user.as_str());
    }
    for option in &target.ssh_options {
        command = command.with_option(option.as_str());
    }
    command
}

fn report(results: &[HostResult], format: OutputFormat) -> CommandOutput {
    CommandOutput {
        text: format_host_results(results, format),
        failures: results.iter().filter(|r| !r.is_ok()).count(),
    }
}
