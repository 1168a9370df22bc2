//! INSERT/UPDATE statement builders shared by every backend.
//!
//! Each backend owns its dialect; the builders only combine identifier quoting, placeholder
//! numbering, and the backend's way of returning generated values.

use std::fmt::Write as _;

use crate::types::{ColumnMap, DatabaseType, RowValues};

/// A statement together with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<RowValues>,
}

/// Identifier quoting, qualification, and placeholders for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect(DatabaseType);

impl Dialect {
    #[must_use]
    pub const fn new(db_type: DatabaseType) -> Self {
        Self(db_type)
    }

    /// Schema used when the caller gives none. MySQL and SQLite leave the table unqualified.
    #[must_use]
    pub fn default_schema(self) -> Option<&'static str> {
        match self.0 {
            DatabaseType::Postgres => Some("public"),
            DatabaseType::Mssql => Some("dbo"),
            DatabaseType::Mysql | DatabaseType::Sqlite => None,
        }
    }

    /// Quote one identifier, doubling any embedded closing quote.
    #[must_use]
    pub fn quote_ident(self, ident: &str) -> String {
        match self.0 {
            DatabaseType::Postgres | DatabaseType::Sqlite => {
                format!("\"{}\"", ident.replace('"', "\"\""))
            }
            DatabaseType::Mysql => format!("`{}`", ident.replace('`', "``")),
            DatabaseType::Mssql => format!("[{}]", ident.replace(']', "]]")),
        }
    }

    /// Quoted, schema-qualified table name. SQLite ignores `schema`.
    #[must_use]
    pub fn qualify(self, schema: Option<&str>, table: &str) -> String {
        if self.0 == DatabaseType::Sqlite {
            return self.quote_ident(table);
        }
        let schema = schema
            .filter(|s| !s.is_empty())
            .or_else(|| self.default_schema());
        match schema {
            Some(schema) => format!("{}.{}", self.quote_ident(schema), self.quote_ident(table)),
            None => self.quote_ident(table),
        }
    }

    /// Placeholder for the 1-based parameter `n`.
    #[must_use]
    pub fn placeholder(self, n: usize) -> String {
        match self.0 {
            DatabaseType::Postgres => format!("${n}"),
            DatabaseType::Sqlite => format!("?{n}"),
            DatabaseType::Mssql => format!("@P{n}"),
            DatabaseType::Mysql => "?".to_string(),
        }
    }

    fn assignments(self, columns: &ColumnMap, first: usize, sep: &str) -> String {
        let mut out = String::new();
        for (idx, name) in columns.keys().enumerate() {
            if idx > 0 {
                out.push_str(sep);
            }
            let _ = write!(
                out,
                "{} = {}",
                self.quote_ident(name),
                self.placeholder(first + idx)
            );
        }
        out
    }

    /// `INSERT` for one row.
    ///
    /// PostgreSQL appends `RETURNING *` and SQL Server adds `OUTPUT INSERTED.*`; the first
    /// returned column is the generated value.
    #[must_use]
    pub fn build_insert(self, schema: Option<&str>, table: &str, row: &ColumnMap) -> Statement {
        let columns: Vec<String> = row.keys().map(|c| self.quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=row.len()).map(|n| self.placeholder(n)).collect();
        let target = self.qualify(schema, table);

        let sql = match self.0 {
            DatabaseType::Postgres => format!(
                "INSERT INTO {target} ({}) VALUES ({}) RETURNING *",
                columns.join(", "),
                placeholders.join(", ")
            ),
            DatabaseType::Mssql => format!(
                "INSERT INTO {target} ({}) OUTPUT INSERTED.* VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            ),
            DatabaseType::Mysql | DatabaseType::Sqlite => format!(
                "INSERT INTO {target} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            ),
        };
        Statement {
            sql,
            params: row.values().cloned().collect(),
        }
    }

    /// `UPDATE … SET … WHERE <key>`; SET parameters are numbered before WHERE parameters.
    #[must_use]
    pub fn build_update(
        self,
        schema: Option<&str>,
        table: &str,
        key: &ColumnMap,
        set: &ColumnMap,
    ) -> Statement {
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.qualify(schema, table),
            self.assignments(set, 1, ", "),
            self.assignments(key, set.len() + 1, " AND ")
        );
        let params = set.values().chain(key.values()).cloned().collect();
        Statement { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, RowValues)]) -> ColumnMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn quoting_per_dialect() {
        assert_eq!(Dialect::new(DatabaseType::Postgres).quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::new(DatabaseType::Mysql).quote_ident("a`b"), "`a``b`");
        assert_eq!(Dialect::new(DatabaseType::Mssql).quote_ident("a]b"), "[a]]b]");
        assert_eq!(Dialect::new(DatabaseType::Sqlite).quote_ident("t"), "\"t\"");
    }

    #[test]
    fn qualification_uses_default_schema() {
        assert_eq!(
            Dialect::new(DatabaseType::Postgres).qualify(None, "users"),
            "\"public\".\"users\""
        );
        assert_eq!(
            Dialect::new(DatabaseType::Mssql).qualify(Some(""), "users"),
            "[dbo].[users]"
        );
        assert_eq!(Dialect::new(DatabaseType::Mysql).qualify(None, "users"), "`users`");
        assert_eq!(
            Dialect::new(DatabaseType::Mysql).qualify(Some("app"), "users"),
            "`app`.`users`"
        );
        assert_eq!(
            Dialect::new(DatabaseType::Sqlite).qualify(Some("main"), "users"),
            "\"users\""
        );
    }

    #[test]
    fn update_numbers_set_before_where() {
        let key = map(&[("id", RowValues::Int(7))]);
        let set = map(&[
            ("name", RowValues::Text("bob".into())),
            ("age", RowValues::Int(30)),
        ]);
        let stmt = Dialect::new(DatabaseType::Postgres).build_update(None, "users", &key, &set);
        assert_eq!(
            stmt.sql,
            "UPDATE \"public\".\"users\" SET \"age\" = $1, \"name\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(
            stmt.params,
            vec![
                RowValues::Int(30),
                RowValues::Text("bob".into()),
                RowValues::Int(7)
            ]
        );

        let stmt = Dialect::new(DatabaseType::Mssql).build_update(None, "users", &key, &set);
        assert_eq!(
            stmt.sql,
            "UPDATE [dbo].[users] SET [age] = @P1, [name] = @P2 WHERE [id] = @P3"
        );
    }

    #[test]
    fn insert_returns_generated_values_where_supported() {
        let row = map(&[("name", RowValues::Text("a".into()))]);
        let pg = Dialect::new(DatabaseType::Postgres).build_insert(Some("s"), "t", &row);
        assert_eq!(pg.sql, "INSERT INTO \"s\".\"t\" (\"name\") VALUES ($1) RETURNING *");

        let ms = Dialect::new(DatabaseType::Mssql).build_insert(None, "t", &row);
        assert_eq!(ms.sql, "INSERT INTO [dbo].[t] ([name]) OUTPUT INSERTED.* VALUES (@P1)");

        let my = Dialect::new(DatabaseType::Mysql).build_insert(None, "t", &row);
        assert_eq!(my.sql, "INSERT INTO `t` (`name`) VALUES (?)");

        let lite = Dialect::new(DatabaseType::Sqlite).build_insert(None, "t", &row);
        assert_eq!(lite.sql, "INSERT INTO \"t\" (\"name\") VALUES (?1)");
    }

    #[test]
    fn composite_key_where_clause() {
        let key = map(&[("a", RowValues::Int(1)), ("b", RowValues::Int(2))]);
        let set = map(&[("c", RowValues::Null)]);
        let stmt = Dialect::new(DatabaseType::Mysql).build_update(None, "t", &key, &set);
        assert_eq!(stmt.sql, "UPDATE `t` SET `c` = ? WHERE `a` = ? AND `b` = ?");
        assert_eq!(stmt.params.len(), 3);
    }
}
