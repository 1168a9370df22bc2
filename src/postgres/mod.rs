// PostgreSQL module - provides the PostgreSQL backend
//
// This module is split into several sub-modules:
// - config: URI parsing and pool setup
// - params: Parameter conversion between RowValues and PostgreSQL types
// - query: Catalog queries and result extraction
// - driver: The `Driver` implementation
// - export: Dump/restore through pg_dump and psql

pub mod config;
pub mod driver;
pub mod export;
pub mod params;
pub mod query;

// Re-export the public API
pub use config::{build_pool, parse_uri};
pub use driver::PostgresDriver;
pub use export::PostgresExporter;
pub use params::Params;
pub use query::build_result_set;
