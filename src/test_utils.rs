/// # Test Utilities Module
///
/// Scripted stand-ins for the driver layer so registry behaviour can be
/// checked without a database server:
/// - `FakeConnector` counts opens and can be told to refuse them
/// - `FakeDriver` counts catalog calls, records statements and can be
///   flipped to a closed state from the test
/// - SQLite file fixtures for tests that want the real driver
use crate::core::db::{ConnectParams, Connector, DatabaseKind, Driver, QueryResult};
use crate::core::{DriverError, ExecError};
use rusqlite::Connection;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use tempfile::NamedTempFile;

/// Observable state shared by a `FakeConnector` and every driver it opened
#[derive(Debug, Default)]
pub struct FakeState {
    pub opens: usize,
    pub closes: usize,
    pub catalog_calls: usize,
    pub statements: Vec<String>,
    pub open: bool,
    pub in_transaction: bool,
}

/// Connector that hands out `FakeDriver`s over a fixed schema
#[derive(Clone)]
pub struct FakeConnector {
    state: Rc<RefCell<FakeState>>,
    tables: Vec<(String, Vec<String>)>,
    open_error: Option<String>,
}

impl FakeConnector {
    /// A connector whose databases hold `orders(id, name, active, qty)` and
    /// `customers(id, name)`
    pub fn new() -> Self {
        FakeConnector {
            state: Rc::new(RefCell::new(FakeState::default())),
            tables: vec![
                (
                    "customers".to_string(),
                    vec!["id".to_string(), "name".to_string()],
                ),
                (
                    "orders".to_string(),
                    ["id", "name", "active", "qty"].iter().map(|c| c.to_string()).collect(),
                ),
            ],
            open_error: None,
        }
    }

    /// A connector whose every open fails with `message`
    pub fn failing(message: &str) -> Self {
        FakeConnector {
            open_error: Some(message.to_string()),
            ..FakeConnector::new()
        }
    }

    pub fn state(&self) -> Ref<'_, FakeState> {
        self.state.borrow()
    }

    /// Simulates the server dropping (or restoring) the session
    pub fn set_open(&self, open: bool) {
        self.state.borrow_mut().open = open;
    }
}

impl Connector for FakeConnector {
    fn open(&mut self, _params: &ConnectParams) -> Result<Box<dyn Driver>, DriverError> {
        let mut state = self.state.borrow_mut();
        state.opens += 1;
        if let Some(message) = &self.open_error {
            return Err(DriverError::new(message.clone()));
        }
        state.open = true;
        Ok(Box::new(FakeDriver {
            state: Rc::clone(&self.state),
            tables: self.tables.clone(),
        }))
    }
}

pub struct FakeDriver {
    state: Rc<RefCell<FakeState>>,
    tables: Vec<(String, Vec<String>)>,
}

impl FakeDriver {
    fn probe_columns(&self, sql: &str) -> Option<Vec<String>> {
        let table = sql.strip_prefix("SELECT * FROM ")?.split(' ').next()?;
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.clone())
    }
}

impl Driver for FakeDriver {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    fn execute(&mut self, sql: &str) -> Result<QueryResult, ExecError> {
        self.state.borrow_mut().statements.push(sql.to_string());
        if sql.contains("FAIL") {
            return Err(ExecError::ExecFailed("division by zero".to_string()));
        }
        match self.probe_columns(sql) {
            Some(columns) => Ok(QueryResult::header_only(columns)),
            None if sql.starts_with("SELECT 1") => Ok(QueryResult::new(
                vec!["?column?".to_string()],
                vec![vec!["1".to_string()]],
            )),
            None => Err(ExecError::PrepareFailed(format!(
                "syntax error at or near \"{}\"",
                sql.split(' ').next().unwrap_or_default()
            ))),
        }
    }

    fn tables(&mut self) -> Result<Vec<String>, DriverError> {
        self.state.borrow_mut().catalog_calls += 1;
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.borrow_mut();
        if state.in_transaction {
            return Err(DriverError::new("cannot start a transaction within a transaction"));
        }
        state.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.finish_transaction("cannot commit - no transaction is active")
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.finish_transaction("cannot rollback - no transaction is active")
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        let mut state = self.state.borrow_mut();
        state.closes += 1;
        state.open = false;
        Ok(())
    }
}

impl FakeDriver {
    fn finish_transaction(&mut self, error: &str) -> Result<(), DriverError> {
        let mut state = self.state.borrow_mut();
        if !state.in_transaction {
            return Err(DriverError::new(error));
        }
        state.in_transaction = false;
        Ok(())
    }
}

/// Creates a SQLite database file with a small `orders`/`customers` schema
pub fn sample_sqlite_file() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER REFERENCES customers(id),
            active INTEGER NOT NULL DEFAULT 1,
            qty INTEGER NOT NULL
        );
        INSERT INTO customers VALUES (1, 'Alice'), (2, 'Bob');
        INSERT INTO orders (customer_id, active, qty) VALUES (1, 1, 3), (2, 0, 0), (2, 1, 7);
        ",
    )
    .unwrap();
    file
}

/// Path of a temp file as the `&str` the registry expects
pub fn path_str(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}
