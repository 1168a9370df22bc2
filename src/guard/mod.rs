//! Safety checks applied before SQL reaches a backend.
//!
//! - `read_only`: lexical gate for caller-supplied queries
//! - `primary_key`: reconciles an update key with the table's real primary key

pub mod primary_key;
pub mod read_only;

pub use primary_key::{check_primary_key, validate_pk_columns};
pub use read_only::validate_read_only_sql;
