/// SQLite Driver Module
///
/// rusqlite-backed `Driver`. Opening never creates a database file: the
/// connection is requested without `SQLITE_OPEN_CREATE`.

use crate::core::{DriverError, ExecError};
use rusqlite::{types::ValueRef, Connection, OpenFlags};
use tracing::debug;

use super::driver::{DatabaseKind, Driver};
use super::query::QueryResult;

const TABLES_SQL: &str = "SELECT name FROM sqlite_master
     WHERE type='table' AND name NOT LIKE 'sqlite_%'
     ORDER BY name";

/// An open SQLite database file
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Opens an existing SQLite database file
    ///
    /// # Errors
    ///
    /// Returns the rusqlite diagnostic if the file cannot be opened as a
    /// database.
    pub fn open(path: &str) -> Result<Self, DriverError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;

        // Initialize connection with common pragmas
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        debug!("Opened SQLite database at {}", path);
        Ok(SqliteDriver { conn })
    }

    /// Wraps an already open connection
    pub fn from_connection(conn: Connection) -> Self {
        SqliteDriver { conn }
    }
}

impl Driver for SqliteDriver {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    fn is_open(&self) -> bool {
        true
    }

    fn execute(&mut self, sql: &str) -> Result<QueryResult, ExecError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| ExecError::PrepareFailed(e.to_string()))?;

        // Get column names
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = stmt.column_count();

        // Stepping the statement runs it, so DML and DDL go through here too
        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value_ref = row.get_ref(i)?;
                    values.push(format_value(value_ref));
                }
                Ok(values)
            })
            .map_err(|e| ExecError::ExecFailed(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ExecError::ExecFailed(e.to_string()))?;

        Ok(QueryResult::new(columns, rows))
    }

    fn tables(&mut self) -> Result<Vec<String>, DriverError> {
        let mut stmt = self.conn.prepare(TABLES_SQL)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        let driver = *self;
        driver.conn.close().map_err(|(_, e)| DriverError::from(e))
    }
}

/// Formats a SQLite value for display
fn format_value(value: ValueRef) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}
