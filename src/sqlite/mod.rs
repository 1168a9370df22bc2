// SQLite module - provides the SQLite backend
//
// This module is split into several sub-modules:
// - config: URI handling and connection setup
// - params: Parameter conversion between RowValues and SQLite values
// - query: Blocking execution helpers and result extraction
// - driver: The `Driver` implementation
// - export: Dump/restore through the sqlite3 CLI

pub mod config;
pub mod driver;
pub mod export;
pub mod params;
pub mod query;

// Re-export the public API
pub use config::{SharedSqliteConnection, sqlite_file_path};
pub use driver::SqliteDriver;
pub use export::SqliteExporter;
pub use params::Params;
