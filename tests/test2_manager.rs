use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use localdb_access::prelude::*;
use tracing_subscriber::fmt::MakeWriter;

/// Driver that only counts how often it was closed.
struct CountingDriver {
    db_type: DatabaseType,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Driver for CountingDriver {
    fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    async fn ping(&self) -> Result<(), DbAccessError> {
        Ok(())
    }

    async fn list_tables(&self, _schema: Option<&str>) -> Result<Vec<String>, DbAccessError> {
        Ok(vec!["t".to_string()])
    }

    async fn describe_table(
        &self,
        _schema: Option<&str>,
        _table: &str,
    ) -> Result<Vec<ColumnInfo>, DbAccessError> {
        Ok(Vec::new())
    }

    async fn run_read_only_query(
        &self,
        _sql: &str,
        _params: &[RowValues],
    ) -> Result<RowSet, DbAccessError> {
        Ok(RowSet::default())
    }

    async fn insert_row(
        &self,
        _schema: Option<&str>,
        _table: &str,
        _row: &ColumnMap,
    ) -> Result<Option<RowValues>, DbAccessError> {
        Ok(None)
    }

    async fn update_row(
        &self,
        _schema: Option<&str>,
        _table: &str,
        _key: &ColumnMap,
        _set: &ColumnMap,
    ) -> Result<u64, DbAccessError> {
        Ok(1)
    }

    async fn close(&self) -> Result<(), DbAccessError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct SlowFactory {
    created: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl DriverFactory for SlowFactory {
    async fn connect(
        &self,
        db_type: DatabaseType,
        _uri: &str,
    ) -> Result<Arc<dyn Driver>, DbAccessError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(Arc::new(CountingDriver {
            db_type,
            closed: Arc::clone(&self.closed),
        }))
    }
}

/// Factory whose errors carry the URI, as a real client library might.
struct LeakyFailingFactory;

#[async_trait]
impl DriverFactory for LeakyFailingFactory {
    async fn connect(
        &self,
        _db_type: DatabaseType,
        uri: &str,
    ) -> Result<Arc<dyn Driver>, DbAccessError> {
        Err(DbAccessError::ConnectionError(format!("dial {uri}: refused")))
    }
}

/// Log sink shared with the subscriber under test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn config() -> ConnectionsConfig {
    ConnectionsConfig::new()
        .with_connection("postgres", "postgres", "postgres://admin:hunter2@db/app")
        .with_connection("legacy", "oracle", "oracle://scott:tiger@db")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_shares_one_driver() -> Result<(), Box<dyn std::error::Error>> {
    let factory = Arc::new(SlowFactory::default());
    let manager = Arc::new(Manager::with_factory(config(), factory.clone()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move { manager.driver("postgres").await }));
    }
    let mut drivers = Vec::new();
    for handle in handles {
        drivers.push(handle.await??);
    }

    let first = &drivers[0];
    assert!(drivers.iter().all(|d| Arc::ptr_eq(d, first)));

    // Every driver built beyond the installed one was closed.
    let created = factory.created.load(Ordering::SeqCst);
    assert!(created >= 1);
    assert_eq!(factory.closed.load(Ordering::SeqCst), created - 1);

    // Later lookups hit the cache.
    let again = manager.driver("postgres").await?;
    assert!(Arc::ptr_eq(&again, first));
    assert_eq!(factory.created.load(Ordering::SeqCst), created);
    Ok(())
}

#[tokio::test]
async fn close_is_idempotent_and_forgets_drivers() -> Result<(), Box<dyn std::error::Error>> {
    let factory = Arc::new(SlowFactory::default());
    let manager = Manager::with_factory(config(), factory.clone());

    manager.driver("postgres").await?;
    manager.close().await?;
    assert_eq!(factory.closed.load(Ordering::SeqCst), 1);
    manager.close().await?;
    assert_eq!(factory.closed.load(Ordering::SeqCst), 1);

    // A fresh driver is created after close.
    manager.driver("postgres").await?;
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn unknown_and_unsupported_connections() {
    let manager = Manager::with_factory(config(), Arc::new(SlowFactory::default()));

    let err = manager.driver("missing").await.unwrap_err();
    assert!(matches!(err, DbAccessError::UnknownConnection(ref id) if id == "missing"));

    let err = manager.driver("legacy").await.unwrap_err();
    match err {
        DbAccessError::UnsupportedType { id, db_type } => {
            assert_eq!(id, "legacy");
            assert_eq!(db_type, "oracle");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn construction_failures_are_sanitized() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let manager = Manager::with_factory(config(), Arc::new(LeakyFailingFactory));

    let err = manager.driver("postgres").await.unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, DbAccessError::ConnectionFailed { .. }));
    assert!(message.contains("\"postgres\""));
    assert!(message.contains("check server logs"));
    assert!(!message.contains("hunter2"));
    assert!(!message.contains("postgres://"));
    assert!(!format!("{err:?}").contains("hunter2"));

    // The underlying cause only reaches the log.
    let logged = logs.contents();
    assert!(logged.contains("driver creation failed"));
    assert!(logged.contains("refused"));
}

#[test]
fn listing_connections_never_shows_uris() {
    let manager = Manager::with_factory(config(), Arc::new(LeakyFailingFactory));
    let infos = manager.connection_infos();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].id, "legacy");
    assert_eq!(infos[1].db_type, "postgres");
    assert!(!format!("{manager:?}").contains("hunter2"));
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn default_factory_opens_sqlite() -> Result<(), Box<dyn std::error::Error>> {
    let manager = Manager::new(ConnectionsConfig::new().with_connection("sqlite", "sqlite", ":memory:"));
    let driver = manager.driver("sqlite").await?;
    assert_eq!(driver.database_type(), DatabaseType::Sqlite);
    driver.ping().await?;
    manager.close().await?;
    assert!(matches!(
        driver.ping().await.unwrap_err(),
        DbAccessError::ConnectionClosed
    ));
    Ok(())
}
