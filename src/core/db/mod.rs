/// Database Module
///
/// ## Architecture
///
/// - **Driver seam** (`driver.rs`): `DatabaseKind`, connection parameters and
///   the `Connector`/`Driver` traits every back end implements
/// - **Back ends** (`sqlite.rs`, `pg.rs`): rusqlite and postgres drivers
/// - **Results** (`query.rs`): the tabular `QueryResult` shared by all drivers
/// - **Registry** (`registry.rs`): named connections and the table-list cache
pub mod driver;
pub mod pg;
pub mod query;
pub mod registry;
pub mod sqlite;

pub use driver::*;
pub use query::*;
pub use registry::*;
