use std::path::Path;

use async_trait::async_trait;

use crate::driver::Exporter;
use crate::error::DbAccessError;
use crate::export::{ToolInvocation, validate_export_path, validate_import_path};

use super::config::MysqlConnInfo;

/// Dump and restore through `mysqldump` and `mysql`.
///
/// The password travels in `MYSQL_PWD`, never on the command line.
#[derive(Debug)]
pub struct MysqlExporter {
    info: MysqlConnInfo,
}

impl MysqlExporter {
    #[must_use]
    pub fn new(info: MysqlConnInfo) -> Self {
        Self { info }
    }

    fn connection_args(&self) -> Vec<String> {
        let mut args = match &self.info.socket {
            Some(socket) => vec!["--socket".to_string(), socket.clone()],
            None => vec![
                "--host".to_string(),
                self.info.host.clone(),
                "--port".to_string(),
                self.info.port.to_string(),
            ],
        };
        if !self.info.user.is_empty() {
            args.extend(["--user".to_string(), self.info.user.clone()]);
        }
        args
    }

    fn tool(&self, binary: &str) -> Result<ToolInvocation, DbAccessError> {
        let mut tool = ToolInvocation::find(binary)?;
        for arg in self.connection_args() {
            tool = tool.arg(arg);
        }
        if let Some(password) = self.info.password() {
            tool = tool.env("MYSQL_PWD", password);
        }
        Ok(tool)
    }
}

#[async_trait]
impl Exporter for MysqlExporter {
    async fn export_database(&self, path: &Path) -> Result<(), DbAccessError> {
        let target = validate_export_path(path)?;
        self.tool("mysqldump")?
            .arg("--result-file")
            .arg(&target)
            .writes_to(&target)
            .arg("--single-transaction")
            .arg("--routines")
            .arg("--triggers")
            .arg(self.info.database.as_str())
            .run()
            .await
    }

    async fn import_database(&self, path: &Path) -> Result<(), DbAccessError> {
        let source = validate_import_path(path)?;
        self.tool("mysql")?
            .arg(self.info.database.as_str())
            .stdin_file(&source)
            .run()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_carry_no_password() {
        let info = MysqlConnInfo::parse("app:hunter2@tcp(db:3307)/shop").unwrap();
        let args = MysqlExporter::new(info).connection_args();
        assert_eq!(args, ["--host", "db", "--port", "3307", "--user", "app"]);
    }
}
