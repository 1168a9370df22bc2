use lazy_static::lazy_static;
use regex::Regex;

use crate::error::DbAccessError;

lazy_static! {
    static ref LINE_COMMENT: Regex = Regex::new(r"--[^\n]*").expect("static regex");
    static ref BLOCK_COMMENT: Regex = Regex::new(r"/\*[\s\S]*?\*/").expect("static regex");
    static ref FORBIDDEN: Regex = Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|TRUNCATE|GRANT|REVOKE|EXEC|EXECUTE|MERGE|REPLACE)\b"
    )
    .expect("static regex");
}

/// Reject SQL that is empty or mentions a write keyword.
///
/// Comments are stripped first, then the remaining text is scanned for whole-word keywords.
/// `_` counts as a word character, so identifiers like `delete_flag` or `updated_at` pass.
/// This is a lexical heuristic: a keyword inside a string literal or a column literally
/// named `insert` is rejected as well.
///
/// # Errors
/// Returns `DbAccessError::EmptyStatement` if nothing but comments and whitespace remain,
/// or `DbAccessError::NotReadOnly` naming the first forbidden keyword (upper-cased).
pub fn validate_read_only_sql(sql: &str) -> Result<(), DbAccessError> {
    let without_lines = LINE_COMMENT.replace_all(sql, " ");
    let stripped = BLOCK_COMMENT.replace_all(&without_lines, " ");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return Err(DbAccessError::EmptyStatement);
    }

    if let Some(found) = FORBIDDEN.find(stripped) {
        return Err(DbAccessError::NotReadOnly {
            keyword: found.as_str().to_uppercase(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reads_pass() {
        for sql in [
            "SELECT 1",
            "  SELECT 1  ",
            "-- c\nSELECT 1",
            "/* c */ SELECT 1",
            "WITH cte AS (SELECT 1) SELECT * FROM cte",
            "select * from pg_catalog.pg_tables",
            "EXPLAIN SELECT 1",
        ] {
            assert!(validate_read_only_sql(sql).is_ok(), "{sql:?} should pass");
        }
    }

    #[test]
    fn writes_are_rejected() {
        let err = validate_read_only_sql("INSERT INTO t VALUES (1)").unwrap_err();
        assert!(matches!(err, DbAccessError::NotReadOnly { ref keyword } if keyword == "INSERT"));

        let err = validate_read_only_sql("SELECT 1; insert INTO t VALUES (1)").unwrap_err();
        assert!(matches!(err, DbAccessError::NotReadOnly { ref keyword } if keyword == "INSERT"));

        let err = validate_read_only_sql("exec sp_who").unwrap_err();
        assert!(matches!(err, DbAccessError::NotReadOnly { ref keyword } if keyword == "EXEC"));
    }

    #[test]
    fn empty_and_comment_only_are_rejected() {
        for sql in ["", "   ", "-- nothing here", "/* a */ -- b\n  "] {
            assert!(
                matches!(validate_read_only_sql(sql), Err(DbAccessError::EmptyStatement)),
                "{sql:?} should be empty"
            );
        }
    }

    #[test]
    fn identifiers_containing_keywords_pass() {
        assert!(validate_read_only_sql("SELECT delete_flag, updated_at, created_by FROM t").is_ok());
        assert!(validate_read_only_sql("SELECT * FROM replacements").is_ok());
    }

    #[test]
    fn bare_keyword_column_is_rejected() {
        assert!(validate_read_only_sql("SELECT \"update\" FROM t").is_err());
    }

    #[test]
    fn keywords_hidden_in_comments_are_ignored() {
        assert!(validate_read_only_sql("SELECT 1 -- DROP TABLE t").is_ok());
        assert!(validate_read_only_sql("SELECT /* DELETE */ 1").is_ok());
    }
}
