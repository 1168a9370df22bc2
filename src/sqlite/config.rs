use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::OpenFlags;
use tokio::sync::Mutex;

use crate::error::DbAccessError;

use super::query::run_blocking;

/// One SQLite connection shared by every operation on a driver.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// True for URIs naming a private in-memory database.
#[must_use]
pub fn is_in_memory(uri: &str) -> bool {
    let uri = uri.trim();
    uri.is_empty()
        || uri == ":memory:"
        || uri.starts_with("file::memory:")
        || uri.contains("mode=memory")
}

/// Filesystem path behind a SQLite URI.
///
/// Accepts plain paths and `file:` URIs; the `file:` prefix and any `?query` are removed.
///
/// # Errors
/// Returns `DbAccessError::ConfigError` for in-memory databases, which have no file.
pub fn sqlite_file_path(uri: &str) -> Result<PathBuf, DbAccessError> {
    if is_in_memory(uri) {
        return Err(DbAccessError::ConfigError(
            "cannot export/import an in-memory SQLite database".into(),
        ));
    }
    let path = match uri.strip_prefix("file:") {
        Some(rest) => rest.split_once('?').map_or(rest, |(p, _)| p),
        None => uri,
    };
    Ok(PathBuf::from(path))
}

/// Open the database behind `uri` and verify it answers.
///
/// # Errors
/// Returns `DbAccessError::SqliteError` if the database cannot be opened or queried.
pub async fn open_connection(uri: &str) -> Result<SharedSqliteConnection, DbAccessError> {
    let uri = uri.trim().to_string();
    let conn = tokio::task::spawn_blocking(move || {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if uri.is_empty() || uri == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open_with_flags(&uri, flags)
        }
    })
    .await
    .map_err(|e| DbAccessError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))??;

    let shared = Arc::new(Mutex::new(conn));
    run_blocking(Arc::clone(&shared), |conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(DbAccessError::SqliteError)
    })
    .await?;
    Ok(shared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_uris_are_reduced_to_paths() {
        assert_eq!(
            sqlite_file_path("file:/tmp/app.db?mode=rwc").unwrap(),
            PathBuf::from("/tmp/app.db")
        );
        assert_eq!(sqlite_file_path("/tmp/app.db").unwrap(), PathBuf::from("/tmp/app.db"));
        assert_eq!(sqlite_file_path("file:rel.db").unwrap(), PathBuf::from("rel.db"));
    }

    #[test]
    fn memory_databases_have_no_path() {
        for uri in [":memory:", "", "file::memory:?cache=shared", "file:x?mode=memory"] {
            assert!(sqlite_file_path(uri).is_err(), "{uri:?}");
        }
    }
}
