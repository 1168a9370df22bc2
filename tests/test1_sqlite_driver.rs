#![cfg(feature = "sqlite")]

use std::path::{Path, PathBuf};

use localdb_access::prelude::*;
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT
    );
    CREATE TABLE memberships (
        tenant_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        role TEXT,
        PRIMARY KEY (tenant_id, user_id)
    );
    CREATE TABLE audit_log (message TEXT);
    INSERT INTO memberships (tenant_id, user_id, role) VALUES (1, 10, 'owner');
";

fn map(pairs: &[(&str, RowValues)]) -> ColumnMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn seed(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.join("app.db");
    let conn = rusqlite::Connection::open(&path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(path)
}

async fn open(dir: &TempDir) -> Result<SqliteDriver, Box<dyn std::error::Error>> {
    let path = seed(dir.path())?;
    Ok(SqliteDriver::connect(&path.to_string_lossy()).await?)
}

#[tokio::test]
async fn catalog_lookups() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let driver = open(&dir).await?;

    driver.ping().await?;
    assert_eq!(driver.database_type(), DatabaseType::Sqlite);

    // sqlite_sequence exists because of AUTOINCREMENT and must be hidden.
    let tables = driver.list_tables(None).await?;
    assert_eq!(tables, vec!["audit_log", "memberships", "users"]);

    let columns = driver.describe_table(Some("ignored"), "users").await?;
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "email"]);
    assert!(columns[0].is_pk);
    assert!(!columns[1].is_pk);
    assert!(!columns[1].nullable);
    assert!(columns[2].nullable);
    assert_eq!(columns[1].data_type, "TEXT");

    let composite = driver.describe_table(None, "memberships").await?;
    let pk: Vec<&str> = composite
        .iter()
        .filter(|c| c.is_pk)
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(pk, vec!["tenant_id", "user_id"]);
    Ok(())
}

#[tokio::test]
async fn insert_then_query_with_dollar_params() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let driver = open(&dir).await?;

    let id = driver
        .insert_row(
            None,
            "users",
            &map(&[
                ("name", RowValues::Text("ada".into())),
                ("email", RowValues::Null),
            ]),
        )
        .await?;
    assert_eq!(id, Some(RowValues::Int(1)));

    let id = driver
        .insert_row(None, "users", &map(&[("name", RowValues::Text("bob".into()))]))
        .await?;
    assert_eq!(id, Some(RowValues::Int(2)));

    let rows = driver
        .run_read_only_query(
            "SELECT id, name, email FROM users WHERE name = $1 OR id = $2 ORDER BY id",
            &[RowValues::Text("bob".into()), RowValues::Int(1)],
        )
        .await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.column_names(), ["id", "name", "email"]);
    assert_eq!(rows.rows()[0].get("name"), Some(&RowValues::Text("ada".into())));
    assert_eq!(rows.rows()[0].get("email"), Some(&RowValues::Null));
    assert_eq!(rows.rows()[1].get("id"), Some(&RowValues::Int(2)));

    let json = serde_json::to_string(&rows)?;
    assert_eq!(
        json,
        r#"[{"id":1,"name":"ada","email":null},{"id":2,"name":"bob","email":null}]"#
    );
    Ok(())
}

#[tokio::test]
async fn insert_without_columns_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let driver = open(&dir).await?;

    let err = driver
        .insert_row(None, "users", &ColumnMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbAccessError::NoColumns));
    Ok(())
}

#[tokio::test]
async fn update_by_primary_key() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let driver = open(&dir).await?;
    driver
        .insert_row(None, "users", &map(&[("name", RowValues::Text("ada".into()))]))
        .await?;

    let key = map(&[("id", RowValues::Int(1))]);
    let set = map(&[("email", RowValues::Text("ada@example.com".into()))]);
    assert_eq!(driver.update_row(None, "users", &key, &set).await?, 1);

    // Writing the current values again still matches the row.
    assert_eq!(driver.update_row(None, "users", &key, &set).await?, 1);

    let missing = map(&[("id", RowValues::Int(999))]);
    let err = driver
        .update_row(None, "users", &missing, &set)
        .await
        .unwrap_err();
    assert!(matches!(err, DbAccessError::RowNotFound));

    let rows = driver
        .run_read_only_query("SELECT email FROM users WHERE id = $1", &[RowValues::Int(1)])
        .await?;
    assert_eq!(
        rows.rows()[0].get("email"),
        Some(&RowValues::Text("ada@example.com".into()))
    );
    Ok(())
}

#[tokio::test]
async fn update_guards_reject_non_pk_keys() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let driver = open(&dir).await?;
    let set = map(&[("role", RowValues::Text("admin".into()))]);

    let partial = map(&[("tenant_id", RowValues::Int(1))]);
    let err = driver
        .update_row(None, "memberships", &partial, &set)
        .await
        .unwrap_err();
    match err {
        DbAccessError::KeyMismatch { expected, provided } => {
            assert_eq!(expected, vec!["tenant_id", "user_id"]);
            assert_eq!(provided, vec!["tenant_id"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let full = map(&[("tenant_id", RowValues::Int(1)), ("user_id", RowValues::Int(10))]);
    assert_eq!(driver.update_row(None, "memberships", &full, &set).await?, 1);

    let err = driver
        .update_row(
            None,
            "audit_log",
            &map(&[("message", RowValues::Text("x".into()))]),
            &map(&[("message", RowValues::Text("y".into()))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbAccessError::NoPrimaryKey { .. }));

    let err = driver
        .update_row(None, "memberships", &ColumnMap::new(), &set)
        .await
        .unwrap_err();
    assert!(matches!(err, DbAccessError::ParameterError(_)));
    let err = driver
        .update_row(None, "memberships", &full, &ColumnMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbAccessError::ParameterError(_)));
    Ok(())
}

#[tokio::test]
async fn closed_driver_refuses_work() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let driver = open(&dir).await?;

    driver.close().await?;
    driver.close().await?;
    assert!(matches!(
        driver.ping().await.unwrap_err(),
        DbAccessError::ConnectionClosed
    ));
    assert!(matches!(
        driver.list_tables(None).await.unwrap_err(),
        DbAccessError::ConnectionClosed
    ));
    Ok(())
}

#[tokio::test]
async fn memory_database_starts_empty() -> Result<(), Box<dyn std::error::Error>> {
    let driver = SqliteDriver::connect(":memory:").await?;
    assert!(driver.list_tables(None).await?.is_empty());
    let rows = driver
        .run_read_only_query("SELECT $1 AS answer", &[RowValues::Int(42)])
        .await?;
    assert_eq!(rows.rows()[0].get("answer"), Some(&RowValues::Int(42)));
    Ok(())
}

#[tokio::test]
async fn export_paths_are_validated() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let driver = open(&dir).await?;
    let exporter = driver.exporter().expect("sqlite exports");

    let err = exporter
        .export_database(&dir.path().join("missing").join("dump.sql"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbAccessError::InvalidPath(_)), "{err:?}");

    let err = exporter
        .import_database(&dir.path().join("nope.sql"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbAccessError::InvalidPath(_)), "{err:?}");
    Ok(())
}
