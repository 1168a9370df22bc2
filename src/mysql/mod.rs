// MySQL module - provides the MySQL backend
//
// This module is split into several sub-modules:
// - config: DSN parsing and pool setup
// - params: Binding RowValues to sqlx queries
// - query: Catalog queries and result extraction
// - driver: The `Driver` implementation
// - export: Dump/restore through mysqldump and mysql

pub mod config;
pub mod driver;
pub mod export;
pub mod params;
pub mod query;

// Re-export the public API
pub use config::MysqlConnInfo;
pub use driver::MysqlDriver;
pub use export::MysqlExporter;
pub use query::build_result_set;
