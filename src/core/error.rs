/// dbdesk Error Module
///
/// Two layers of error types live here. The registry contract types
/// (`ConnectError`, `ExecError`, `DriverError`) describe what a caller of
/// the connection registry can observe. `DbdeskError` covers everything
/// around it: configuration, history storage, export and shell commands.
use thiserror::Error;

/// Diagnostic text reported by a database driver, passed through verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        DriverError(message.into())
    }
}

impl From<rusqlite::Error> for DriverError {
    fn from(e: rusqlite::Error) -> Self {
        DriverError(e.to_string())
    }
}

impl From<postgres::Error> for DriverError {
    fn from(e: postgres::Error) -> Self {
        DriverError(e.to_string())
    }
}

/// Failure modes of `ConnectionRegistry::connect`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// A connection with the requested name is already registered
    #[error("Connection with this name already exists")]
    AlreadyExists,

    /// The SQLite target does not name an existing, readable file
    #[error("Database file does not exist")]
    FileNotFound,

    /// The driver refused to open the connection
    #[error("{0}")]
    DriverError(String),
}

impl From<DriverError> for ConnectError {
    fn from(e: DriverError) -> Self {
        ConnectError::DriverError(e.0)
    }
}

/// Failure modes of `ConnectionRegistry::execute`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// No connection is registered under the name
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// The connection is registered but its handle is no longer open
    #[error("Database not open: {0}")]
    ConnectionClosed(String),

    /// The statement could not be prepared
    #[error("{0}")]
    PrepareFailed(String),

    /// The statement was prepared but failed while running
    #[error("{0}")]
    ExecFailed(String),
}

/// Application-wide error type for everything outside the registry contract.
#[derive(Error, Debug)]
pub enum DbdeskError {
    /// History storage and other local SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connecting failed
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// Executing a statement failed
    #[error("Query error: {0}")]
    Exec(#[from] ExecError),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Result export errors (unknown format, write failure)
    #[error("Export error: {0}")]
    Export(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Shell command validation errors
    #[error("Command error: {0}")]
    Command(String),
}

/// Type alias for Result to use DbdeskError as the error type.
pub type Result<T> = std::result::Result<T, DbdeskError>;
