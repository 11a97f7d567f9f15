/// Driver Seam Module
///
/// The registry never talks to rusqlite or postgres directly. It opens
/// connections through a `Connector` and uses them through the `Driver`
/// trait, one implementation per `DatabaseKind`.

use crate::core::{DriverError, ExecError};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pg::PgDriver;
use super::query::QueryResult;
use super::sqlite::SqliteDriver;

/// The database engines a connection can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    /// A local SQLite database file
    Sqlite,
    /// A PostgreSQL server reached over the network
    #[serde(alias = "postgresql")]
    Postgres,
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::Sqlite => write!(f, "SQLite"),
            DatabaseKind::Postgres => write!(f, "PostgreSQL"),
        }
    }
}

/// Everything needed to open one connection.
///
/// `target` is the file path for SQLite and the database name for
/// PostgreSQL. The network fields are ignored by SQLite. A `port` of zero
/// or less selects the driver default.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub kind: DatabaseKind,
    pub target: String,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: i32,
}

impl ConnectParams {
    /// Parameters for a SQLite database file
    pub fn sqlite(path: impl Into<String>) -> Self {
        ConnectParams {
            kind: DatabaseKind::Sqlite,
            target: path.into(),
            host: None,
            user: None,
            password: None,
            port: -1,
        }
    }

    /// Parameters for a PostgreSQL database, to be refined with the builder methods
    pub fn postgres(database: impl Into<String>) -> Self {
        ConnectParams {
            kind: DatabaseKind::Postgres,
            ..ConnectParams::sqlite(database)
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn port(mut self, port: i32) -> Self {
        self.port = port;
        self
    }

    /// The port to hand to the driver, `None` meaning "driver default".
    ///
    /// # Errors
    ///
    /// Returns a `DriverError` for positive ports outside the TCP range.
    pub fn effective_port(&self) -> Result<Option<u16>, DriverError> {
        if self.port <= 0 {
            return Ok(None);
        }
        u16::try_from(self.port)
            .map(Some)
            .map_err(|_| DriverError(format!("invalid port number: {}", self.port)))
    }
}

// Keeps passwords out of logs.
impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("port", &self.port)
            .finish()
    }
}

/// An open database handle, owned by the registry.
pub trait Driver {
    /// The engine behind this handle
    fn kind(&self) -> DatabaseKind;

    /// Whether the handle can still run statements
    fn is_open(&self) -> bool;

    /// Prepares and runs one statement, rendering every cell as text.
    ///
    /// Must report `ExecError::PrepareFailed` when the statement is rejected
    /// before running and `ExecError::ExecFailed` when it fails mid-run.
    fn execute(&mut self, sql: &str) -> Result<QueryResult, ExecError>;

    /// Queries the engine's catalog for user table names
    fn tables(&mut self) -> Result<Vec<String>, DriverError>;

    fn begin(&mut self) -> Result<(), DriverError>;
    fn commit(&mut self) -> Result<(), DriverError>;
    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Closes the handle, reporting any error the engine raises while doing so
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Opens driver handles from connection parameters.
pub trait Connector {
    fn open(&mut self, params: &ConnectParams) -> Result<Box<dyn Driver>, DriverError>;
}

/// Connector backed by the real rusqlite and postgres drivers
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeConnector;

impl Connector for NativeConnector {
    fn open(&mut self, params: &ConnectParams) -> Result<Box<dyn Driver>, DriverError> {
        match params.kind {
            DatabaseKind::Sqlite => Ok(Box::new(SqliteDriver::open(&params.target)?)),
            DatabaseKind::Postgres => Ok(Box::new(PgDriver::open(params)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_defaults() {
        assert_eq!(ConnectParams::postgres("app").effective_port(), Ok(None));
        assert_eq!(ConnectParams::postgres("app").port(0).effective_port(), Ok(None));
        assert_eq!(ConnectParams::postgres("app").port(-5).effective_port(), Ok(None));
        assert_eq!(
            ConnectParams::postgres("app").port(5433).effective_port(),
            Ok(Some(5433))
        );
        assert!(ConnectParams::postgres("app").port(70000).effective_port().is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let params = ConnectParams::postgres("app").user("alice").password("hunter2");
        let rendered = format!("{:?}", params);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_kind_from_config_names() {
        #[derive(Deserialize)]
        struct Probe {
            kind: DatabaseKind,
        }
        let probe: Probe = toml::from_str("kind = \"postgresql\"").unwrap();
        assert_eq!(probe.kind, DatabaseKind::Postgres);
        let probe: Probe = toml::from_str("kind = \"sqlite\"").unwrap();
        assert_eq!(probe.kind, DatabaseKind::Sqlite);
    }
}
