// SQL Server module - provides the SQL Server backend
//
// This module is split into several sub-modules:
// - config: Connection string parsing and pool setup
// - params: Binding RowValues to tiberius queries
// - query: Catalog queries and result extraction
// - driver: The `Driver` implementation
// - export: Generated export script and sqlcmd import

pub mod config;
pub mod driver;
pub mod export;
pub mod params;
pub mod query;

// Re-export the public API
pub use config::{MssqlClient, MssqlConnInfo, MssqlPool, SqlcmdTarget};
pub use driver::MssqlDriver;
pub use query::build_result_set;
