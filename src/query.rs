//! SQL queries against appliance databases.
//!
//! The admin CLI exposes the call-manager database through `run sql` and
//! unity databases through `run cuc dbquery <db>`. Query text and database
//! names are passed through untouched.

use crate::error::Result;
use crate::session::{Session, Transport};
use crate::table::{LayoutOptions, Record, TableFamily, decode_table, render_csv};
use serde::Serialize;
use tracing::debug;

/// Name of the call-manager database.
pub const CALL_MANAGER_DB: &str = "ccm";

/// Target database of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "name")]
pub enum Database {
    /// The call-manager database.
    CallManager,
    /// A unity database, by name (e.g. `unitydirdb`).
    Unity(String),
}

impl Database {
    /// Selects the database for a name; anything other than `ccm` is a
    /// unity database.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name == CALL_MANAGER_DB {
            Self::CallManager
        } else {
            Self::Unity(name.to_string())
        }
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::CallManager => CALL_MANAGER_DB,
            Self::Unity(name) => name,
        }
    }

    /// Builds the CLI command line that runs `sql`.
    #[must_use]
    pub fn query_command(&self, sql: &str) -> String {
        match self {
            Self::CallManager => format!("run sql {sql}"),
            Self::Unity(db) => format!("run cuc dbquery {db} {sql}"),
        }
    }

    /// Returns the table family of this database's output.
    #[must_use]
    pub const fn family(&self) -> TableFamily {
        match self {
            Self::CallManager => TableFamily::CallManager,
            Self::Unity(_) => TableFamily::Unity,
        }
    }

    /// Returns the layout preset for this database's output.
    #[must_use]
    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions::for_family(self.family())
    }
}

/// Requested shape of a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFormat {
    /// Undecoded command output.
    Raw,
    /// Decoded records.
    Rows,
    /// Decoded records rendered as CSV.
    Csv,
}

/// Result of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    /// Undecoded command output.
    Raw(String),
    /// Decoded records; the column-name row comes first.
    Rows(Vec<Record>),
    /// CSV rendering of the records.
    Csv(String),
}

/// Runs `sql` against `db` and shapes the result.
///
/// # Errors
///
/// Returns a session error if the command does not complete, or a decode
/// error if the output has no separator line (e.g. the query failed and
/// the appliance printed a message instead of a table).
pub fn run_query<T: Transport>(
    session: &mut Session<T>,
    db: &Database,
    sql: &str,
    format: QueryFormat,
) -> Result<QueryOutput> {
    let command = db.query_command(sql);
    let raw = session.execute(&command)?;

    if format == QueryFormat::Raw {
        return Ok(QueryOutput::Raw(raw));
    }

    let records = decode_table(&raw, &db.layout_options())?;
    debug!(db = db.name(), rows = records.len(), "query decoded");

    Ok(match format {
        QueryFormat::Csv => QueryOutput::Csv(render_csv(&records)),
        _ => QueryOutput::Rows(records),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, Error};
    use crate::session::{Framing, MemoryTransport, SessionConfig};
    use std::time::Duration;

    fn session(reply: &str) -> Session<MemoryTransport> {
        let transport = MemoryTransport::new("cucm")
            .then_send("admin:")
            .then_send(reply)
            .hold_open();
        let config = SessionConfig::new()
            .with_timeout(Duration::from_millis(500))
            .with_echo_grace(Duration::from_millis(50));
        Session::connect(transport, config).unwrap()
    }

    #[test]
    fn test_database_dispatch() {
        assert_eq!(Database::from_name("ccm"), Database::CallManager);
        assert_eq!(
            Database::from_name("unitydirdb"),
            Database::Unity("unitydirdb".to_string())
        );
        assert_eq!(
            Database::CallManager.query_command("select name from device"),
            "run sql select name from device"
        );
        assert_eq!(
            Database::from_name("unitydirdb").query_command("select alias from vw_user"),
            "run cuc dbquery unitydirdb select alias from vw_user"
        );
        assert_eq!(Database::from_name("alt").family(), TableFamily::Unity);
        assert_eq!(Database::CallManager.name(), "ccm");
    }

    #[test]
    fn test_run_query_call_manager_rows() {
        let mut session = session(
            "run sql select name from typemodel\r\n\
             name \r\n\
             ==== \r\n\
             7960 \r\n\
             8845 \r\n\
             admin:",
        );
        let output = run_query(
            &mut session,
            &Database::CallManager,
            "select name from typemodel",
            QueryFormat::Rows,
        )
        .unwrap();

        let QueryOutput::Rows(rows) = output else {
            unreachable!("rows requested");
        };
        let names: Vec<&str> = rows.iter().filter_map(|r| r.get(0)).collect();
        assert_eq!(names, vec!["name", "7960", "8845"]);
        assert_eq!(
            session.transport().written(),
            b"run sql select name from typemodel\n"
        );
    }

    #[test]
    fn test_run_query_unity_csv() {
        let mut session = session(
            "run cuc dbquery unitydirdb select alias,displayname from vw_user\r\n\r\n\
             alias  displayname\r\n\
             -----  -----------\r\n\
             jdoe   Doe, John\r\n\
             \r\n\
             admin:",
        );
        let output = run_query(
            &mut session,
            &Database::from_name("unitydirdb"),
            "select alias,displayname from vw_user",
            QueryFormat::Csv,
        )
        .unwrap();
        assert_eq!(
            output,
            QueryOutput::Csv("alias,displayname\r\njdoe,\"Doe, John\"\r\n".to_string())
        );
    }

    #[test]
    fn test_run_query_raw_skips_decoding() {
        let mut session = session("run sql bogus\r\nSyntax error\r\nadmin:");
        let output = run_query(
            &mut session,
            &Database::CallManager,
            "bogus",
            QueryFormat::Raw,
        )
        .unwrap();
        assert_eq!(output, QueryOutput::Raw("Syntax error\r".to_string()));
    }

    #[test]
    fn test_run_query_reports_missing_separator() {
        let mut session = session("run sql bogus\r\nSyntax error\r\nadmin:");
        let err = run_query(
            &mut session,
            &Database::CallManager,
            "bogus",
            QueryFormat::Rows,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::NoSeparatorFound { .. })
        ));
    }

    #[test]
    fn test_framing_can_be_pinned() {
        let transport = MemoryTransport::new("cuc")
            .then_send("admin:")
            .then_send("cmd\r\n\r\nalias\r\n-----\r\njdoe\r\n\r\nadmin:")
            .hold_open();
        let config = SessionConfig::new()
            .with_timeout(Duration::from_millis(500))
            .with_framing(Framing::Padded);
        let mut session = Session::connect(transport, config).unwrap();
        let output = run_query(
            &mut session,
            &Database::from_name("unitydirdb"),
            "select alias from vw_user",
            QueryFormat::Rows,
        )
        .unwrap();
        assert_eq!(
            output,
            QueryOutput::Rows(vec![
                Record::from(vec!["alias".to_string()]),
                Record::from(vec!["jdoe".to_string()]),
            ])
        );
    }
}
