use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::types::DatabaseType;

lazy_static! {
    static ref POSITIONAL: Regex = Regex::new(r"\$(\d+)").expect("static regex");
}

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1` (the canonical input form).
    Postgres,
    /// SQLite-style numbered placeholders like `?1`.
    Sqlite,
    /// SQL Server named placeholders like `@p1`.
    Mssql,
    /// MySQL anonymous placeholders `?`, bound in order of appearance.
    Mysql,
}

impl From<DatabaseType> for PlaceholderStyle {
    fn from(db_type: DatabaseType) -> Self {
        match db_type {
            DatabaseType::Postgres => PlaceholderStyle::Postgres,
            DatabaseType::Mysql => PlaceholderStyle::Mysql,
            DatabaseType::Mssql => PlaceholderStyle::Mssql,
            DatabaseType::Sqlite => PlaceholderStyle::Sqlite,
        }
    }
}

/// Rewrite canonical `$N` markers into `target`'s syntax.
///
/// This is a plain textual substitution: a `$N` inside a string literal is rewritten too, so
/// query text must not contain literal dollar-digit sequences. Returns a borrowed `Cow` when
/// no changes are needed.
///
/// For [`PlaceholderStyle::Mysql`] every marker becomes `?`, so the parameter slice must list
/// values in the order the markers appear, left to right.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    match target {
        PlaceholderStyle::Postgres => Cow::Borrowed(sql),
        PlaceholderStyle::Sqlite => POSITIONAL.replace_all(sql, "?$1"),
        PlaceholderStyle::Mssql => POSITIONAL.replace_all(sql, "@p$1"),
        PlaceholderStyle::Mysql => POSITIONAL.replace_all(sql, |_: &Captures<'_>| "?"),
    }
}
