/// PostgreSQL Driver Module
///
/// Blocking `postgres` client behind the `Driver` trait. Statements are
/// prepared first, so a rejected statement reports `PrepareFailed` and the
/// header is known even for empty results. The rows are then fetched with
/// the simple query protocol, which hands every cell back as text.

use crate::core::{DriverError, ExecError};
use postgres::{Client, Config, NoTls, SimpleQueryMessage};
use tracing::debug;

use super::driver::{ConnectParams, DatabaseKind, Driver};
use super::query::QueryResult;

const DEFAULT_HOST: &str = "localhost";

const TABLES_SQL: &str = "SELECT (CASE WHEN table_schema = 'public' THEN table_name
                  ELSE table_schema || '.' || table_name END)::text
     FROM information_schema.tables
     WHERE table_type = 'BASE TABLE'
       AND table_schema NOT IN ('pg_catalog', 'information_schema')
     ORDER BY table_schema, table_name";

/// An open PostgreSQL session
pub struct PgDriver {
    client: Client,
}

impl PgDriver {
    /// Connects using the network fields of `params`; `target` is the database name.
    ///
    /// # Errors
    ///
    /// Returns the driver diagnostic for authentication, network or
    /// configuration failures.
    pub fn open(params: &ConnectParams) -> Result<Self, DriverError> {
        let mut config = Config::new();
        config.dbname(&params.target);
        config.host(non_empty(&params.host).unwrap_or(DEFAULT_HOST));
        if let Some(user) = non_empty(&params.user) {
            config.user(user);
        }
        if let Some(password) = non_empty(&params.password) {
            config.password(password);
        }
        if let Some(port) = params.effective_port()? {
            config.port(port);
        }
        config.application_name("dbdesk");

        let client = config.connect(NoTls)?;
        debug!(database = %params.target, "Opened PostgreSQL session");
        Ok(PgDriver { client })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Driver for PgDriver {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn is_open(&self) -> bool {
        !self.client.is_closed()
    }

    fn execute(&mut self, sql: &str) -> Result<QueryResult, ExecError> {
        let statement = self
            .client
            .prepare(sql)
            .map_err(|e| ExecError::PrepareFailed(e.to_string()))?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let messages = self
            .client
            .simple_query(sql)
            .map_err(|e| ExecError::ExecFailed(e.to_string()))?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if row.len() != columns.len() {
                    return Err(ExecError::ExecFailed(format!(
                        "row has {} columns, header has {}",
                        row.len(),
                        columns.len()
                    )));
                }
                let cells = (0..row.len())
                    .map(|i| row.get(i).unwrap_or("NULL").to_string())
                    .collect();
                rows.push(cells);
            }
        }

        Ok(QueryResult::new(columns, rows))
    }

    fn tables(&mut self) -> Result<Vec<String>, DriverError> {
        let rows = self.client.query(TABLES_SQL, &[])?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.client.batch_execute("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.client.batch_execute("ROLLBACK")?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        let driver = *self;
        driver.client.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_port_fails_before_connecting() {
        let params = ConnectParams::postgres("app").host("localhost").port(99999);
        match PgDriver::open(&params) {
            Err(DriverError(msg)) => assert!(msg.contains("invalid port")),
            Ok(_) => panic!("Expected port validation error"),
        }
    }

    #[test]
    fn test_non_empty_filters_blank_fields() {
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&None), None);
        assert_eq!(non_empty(&Some("db.local".to_string())), Some("db.local"));
    }
}
