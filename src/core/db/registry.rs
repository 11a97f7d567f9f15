/// Connection Registry Module
///
/// Owns every open database handle, keyed by a user-chosen connection name,
/// plus a per-connection cache of table names. Callers only ever hold names;
/// the handles themselves stay in an internal arena so nothing outside the
/// registry can use a connection after `disconnect`.
///
/// Two error contracts coexist here on purpose:
/// - `connect` and `execute` return typed errors
/// - `list_tables` and `list_columns` return an empty list on any failure,
///   and the transaction calls return a bare `bool`
///
/// Every failure of a typed or boolean call is also recorded in
/// `last_error`, which successful calls leave untouched.

use crate::core::{ConnectError, ExecError};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, warn};

use super::driver::{ConnectParams, Connector, DatabaseKind, Driver, NativeConnector};
use super::query::QueryResult;

/// Index of a slot in the handle arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConnectionId(usize);

struct ConnectionSlot {
    name: String,
    driver: Box<dyn Driver>,
}

#[derive(Debug, Clone, Copy)]
enum TransactionOp {
    Begin,
    Commit,
    Rollback,
}

/// Registry of named database connections
pub struct ConnectionRegistry<C: Connector = NativeConnector> {
    connector: C,
    slots: Vec<Option<ConnectionSlot>>,
    free: Vec<ConnectionId>,
    names: BTreeMap<String, ConnectionId>,
    tables_cache: HashMap<String, Vec<String>>,
    last_error: String,
}

impl ConnectionRegistry<NativeConnector> {
    /// Creates a registry backed by the real SQLite and PostgreSQL drivers
    pub fn new() -> Self {
        ConnectionRegistry::with_connector(NativeConnector)
    }
}

impl Default for ConnectionRegistry<NativeConnector> {
    fn default() -> Self {
        ConnectionRegistry::new()
    }
}

impl<C: Connector> ConnectionRegistry<C> {
    /// Creates an empty registry that opens handles through `connector`
    pub fn with_connector(connector: C) -> Self {
        ConnectionRegistry {
            connector,
            slots: Vec::new(),
            free: Vec::new(),
            names: BTreeMap::new(),
            tables_cache: HashMap::new(),
            last_error: String::new(),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Opens a connection and registers it under `name`
    ///
    /// # Errors
    ///
    /// - `ConnectError::AlreadyExists` if `name` is taken; the registry is unchanged
    /// - `ConnectError::FileNotFound` if a SQLite target is not an existing,
    ///   readable file; the driver is never invoked in that case
    /// - `ConnectError::DriverError` with the driver's own message otherwise
    pub fn connect(&mut self, name: &str, params: ConnectParams) -> Result<(), ConnectError> {
        let result = self.try_connect(name, &params);
        if let Err(e) = &result {
            warn!(connection = name, kind = %params.kind, "Connect failed: {}", e);
            self.record_error(e.to_string());
        }
        result
    }

    fn try_connect(&mut self, name: &str, params: &ConnectParams) -> Result<(), ConnectError> {
        if self.names.contains_key(name) {
            return Err(ConnectError::AlreadyExists);
        }
        if params.kind == DatabaseKind::Sqlite && !is_readable_file(&params.target) {
            return Err(ConnectError::FileNotFound);
        }

        let driver = self.connector.open(params)?;
        let id = self.allocate(ConnectionSlot {
            name: name.to_string(),
            driver,
        });
        self.names.insert(name.to_string(), id);
        self.tables_cache.remove(name);

        info!(connection = name, kind = %params.kind, target = %params.target, "Connected");
        Ok(())
    }

    /// Closes and forgets the connection; unknown names are ignored
    pub fn disconnect(&mut self, name: &str) {
        let Some(id) = self.names.remove(name) else {
            return;
        };
        self.tables_cache.remove(name);

        if let Some(slot) = self.slots.get_mut(id.0).and_then(Option::take) {
            if let Err(e) = slot.driver.close() {
                warn!(connection = %slot.name, "Error while closing connection: {}", e);
            }
        }
        self.free.push(id);
        info!(connection = name, "Disconnected");
    }

    /// Runs one statement against the named connection
    ///
    /// Reads and writes are not distinguished; whatever the SQL does to the
    /// database happens.
    ///
    /// # Errors
    ///
    /// `ConnectionNotFound`, `ConnectionClosed`, or the driver's
    /// `PrepareFailed`/`ExecFailed` diagnostic.
    pub fn execute(&mut self, sql: &str, name: &str) -> Result<QueryResult, ExecError> {
        let result = self
            .open_driver(name)
            .and_then(|driver| driver.execute(sql));
        match &result {
            Ok(r) => debug!(connection = name, rows = r.row_count, "Executed statement"),
            Err(e) => {
                debug!(connection = name, "Statement failed: {}", e);
                self.record_error(e.to_string());
            }
        }
        result
    }

    /// Runs `SELECT * FROM <table> LIMIT <limit>` against the named connection
    pub fn preview_table(
        &mut self,
        table: &str,
        name: &str,
        limit: usize,
    ) -> Result<QueryResult, ExecError> {
        self.execute(&format!("SELECT * FROM {} LIMIT {}", table, limit), name)
    }

    /// Table names of the named connection, from the cache when present.
    ///
    /// Returns an empty list, never an error, when the connection is unknown
    /// or closed or the catalog query fails. Failed lookups are not cached.
    /// The cache is only refreshed by reconnecting; schema changes made with
    /// `execute` are not noticed.
    pub fn list_tables(&mut self, name: &str) -> Vec<String> {
        if let Some(tables) = self.tables_cache.get(name) {
            debug!(connection = name, "Table list cache hit");
            return tables.clone();
        }

        let driver = match self.open_driver(name) {
            Ok(driver) => driver,
            Err(_) => return Vec::new(),
        };
        let tables = match driver.tables() {
            Ok(tables) => tables,
            Err(e) => {
                warn!(connection = name, "Catalog query failed: {}", e);
                return Vec::new();
            }
        };

        debug!(connection = name, count = tables.len(), "Table list cached");
        self.tables_cache.insert(name.to_string(), tables.clone());
        tables
    }

    /// Column names of `table`, discovered by running
    /// `SELECT * FROM <table> LIMIT 1` and reading the result header.
    ///
    /// This probe is a real (bounded) query. Any failure, including an
    /// unknown connection or a missing table, yields an empty list. Not cached.
    pub fn list_columns(&mut self, table: &str, name: &str) -> Vec<String> {
        let probe = format!("SELECT * FROM {} LIMIT 1", table);
        let driver = match self.open_driver(name) {
            Ok(driver) => driver,
            Err(_) => return Vec::new(),
        };
        match driver.execute(&probe) {
            Ok(result) => result.columns,
            Err(e) => {
                debug!(connection = name, table, "Column probe failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Names of all registered connections, in lexicographic order
    pub fn active_connections(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<DatabaseKind> {
        self.slot(name).map(|slot| slot.driver.kind())
    }

    /// The most recent diagnostic recorded by a failing registry call
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn begin_transaction(&mut self, name: &str) -> bool {
        self.transaction(name, TransactionOp::Begin)
    }

    pub fn commit_transaction(&mut self, name: &str) -> bool {
        self.transaction(name, TransactionOp::Commit)
    }

    pub fn rollback_transaction(&mut self, name: &str) -> bool {
        self.transaction(name, TransactionOp::Rollback)
    }

    fn transaction(&mut self, name: &str, op: TransactionOp) -> bool {
        let outcome = match self.slot_mut(name) {
            None => Err(ExecError::ConnectionNotFound(name.to_string()).to_string()),
            Some(slot) => match op {
                TransactionOp::Begin => slot.driver.begin(),
                TransactionOp::Commit => slot.driver.commit(),
                TransactionOp::Rollback => slot.driver.rollback(),
            }
            .map_err(|e| e.0),
        };

        match outcome {
            Ok(()) => {
                debug!(connection = name, ?op, "Transaction step succeeded");
                true
            }
            Err(message) => {
                warn!(connection = name, ?op, "Transaction step failed: {}", message);
                self.record_error(message);
                false
            }
        }
    }

    fn record_error(&mut self, message: String) {
        self.last_error = message;
    }

    fn allocate(&mut self, slot: ConnectionSlot) -> ConnectionId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = Some(slot);
                id
            }
            None => {
                self.slots.push(Some(slot));
                ConnectionId(self.slots.len() - 1)
            }
        }
    }

    fn slot(&self, name: &str) -> Option<&ConnectionSlot> {
        let id = self.names.get(name)?;
        self.slots.get(id.0)?.as_ref()
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut ConnectionSlot> {
        let id = self.names.get(name)?;
        self.slots.get_mut(id.0)?.as_mut()
    }

    fn open_driver(&mut self, name: &str) -> Result<&mut Box<dyn Driver>, ExecError> {
        let slot = self
            .slot_mut(name)
            .ok_or_else(|| ExecError::ConnectionNotFound(name.to_string()))?;
        if !slot.driver.is_open() {
            return Err(ExecError::ConnectionClosed(name.to_string()));
        }
        Ok(&mut slot.driver)
    }
}

impl<C: Connector> Drop for ConnectionRegistry<C> {
    fn drop(&mut self) {
        for name in self.active_connections() {
            self.disconnect(&name);
        }
    }
}

/// An existing regular file that can be opened for reading
fn is_readable_file(path: &str) -> bool {
    let path = Path::new(path);
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false) && File::open(path).is_ok()
}
