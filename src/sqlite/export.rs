use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::driver::Exporter;
use crate::error::DbAccessError;
use crate::export::{ToolInvocation, validate_export_path, validate_import_path};

use super::config::sqlite_file_path;

/// Dump and restore through the `sqlite3` CLI.
pub struct SqliteExporter {
    uri: String,
}

impl SqliteExporter {
    #[must_use]
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.trim().to_string(),
        }
    }
}

impl fmt::Debug for SqliteExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteExporter").finish_non_exhaustive()
    }
}

#[async_trait]
impl Exporter for SqliteExporter {
    /// `sqlite3 <db> .dump`, with stdout written to `path`.
    async fn export_database(&self, path: &Path) -> Result<(), DbAccessError> {
        let target = validate_export_path(path)?;
        let db_path = sqlite_file_path(&self.uri)?;
        ToolInvocation::find("sqlite3")?
            .arg(db_path)
            .arg(".dump")
            .stdout_file(&target)
            .run()
            .await
    }

    /// Pipe the file at `path` into `sqlite3 <db>`.
    async fn import_database(&self, path: &Path) -> Result<(), DbAccessError> {
        let source = validate_import_path(path)?;
        let db_path = sqlite_file_path(&self.uri)?;
        ToolInvocation::find("sqlite3")?
            .arg(db_path)
            .stdin_file(&source)
            .run()
            .await
    }
}
