/// Core Module for dbdesk
///
/// This module contains the connection registry, the driver seam beneath
/// it and the shared error types.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{ConnectError, DbdeskError, DriverError, ExecError, Result};
