//! Lazily created, cached drivers keyed by connection id.
//!
//! Construction happens outside the cache lock so a slow server never blocks lookups for
//! other ids. When two callers race to create the same id, the first to install wins and
//! the other closes its freshly built driver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::config::{ConnectionInfo, ConnectionsConfig};
use crate::driver::Driver;
use crate::error::DbAccessError;
use crate::types::DatabaseType;

/// Builds a connected driver for one backend.
///
/// The default [`BackendFactory`] dispatches to the compiled-in backends; tests substitute
/// their own.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Connect to `uri`. Errors may carry backend detail and are never shown to callers.
    async fn connect(
        &self,
        db_type: DatabaseType,
        uri: &str,
    ) -> Result<Arc<dyn Driver>, DbAccessError>;
}

/// Factory over the backends enabled by cargo features.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackendFactory;

#[async_trait]
impl DriverFactory for BackendFactory {
    async fn connect(
        &self,
        db_type: DatabaseType,
        uri: &str,
    ) -> Result<Arc<dyn Driver>, DbAccessError> {
        match db_type {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Ok(Arc::new(
                crate::postgres::PostgresDriver::connect(uri).await?,
            )),
            #[cfg(feature = "mysql")]
            DatabaseType::Mysql => Ok(Arc::new(crate::mysql::MysqlDriver::connect(uri).await?)),
            #[cfg(feature = "mssql")]
            DatabaseType::Mssql => Ok(Arc::new(crate::mssql::MssqlDriver::connect(uri).await?)),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Ok(Arc::new(crate::sqlite::SqliteDriver::connect(uri).await?)),
            #[allow(unreachable_patterns)]
            other => Err(DbAccessError::Unimplemented(format!(
                "{other} support is not compiled in"
            ))),
        }
    }
}

/// Hands out one shared driver per configured connection id.
pub struct Manager {
    config: ConnectionsConfig,
    factory: Arc<dyn DriverFactory>,
    drivers: Mutex<HashMap<String, Arc<dyn Driver>>>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.config)
            .field("cached", &self.cached_ids())
            .finish_non_exhaustive()
    }
}

impl Manager {
    #[must_use]
    pub fn new(config: ConnectionsConfig) -> Self {
        Self::with_factory(config, Arc::new(BackendFactory))
    }

    #[must_use]
    pub fn with_factory(config: ConnectionsConfig, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            config,
            factory,
            drivers: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionsConfig {
        &self.config
    }

    /// Configured connections as `(id, type)` pairs. No URIs.
    #[must_use]
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        self.config.connection_infos()
    }

    fn cached_ids(&self) -> Vec<String> {
        let drivers = self.drivers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = drivers.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn cached(&self, id: &str) -> Option<Arc<dyn Driver>> {
        self.drivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Driver for `id`, connecting on first use.
    ///
    /// # Errors
    /// - `UnknownConnection` if `id` is not configured.
    /// - `UnsupportedType` if its type tag is unknown or the backend is not compiled in.
    /// - `ConnectionFailed` if construction fails. The underlying error is logged, never
    ///   returned.
    pub async fn driver(&self, id: &str) -> Result<Arc<dyn Driver>, DbAccessError> {
        let (Some(uri), Some(type_tag)) = (self.config.uri(id), self.config.type_tag(id)) else {
            return Err(DbAccessError::UnknownConnection(id.to_string()));
        };
        let db_type = match type_tag.parse::<DatabaseType>() {
            Ok(db_type) if db_type.is_enabled() => db_type,
            _ => {
                return Err(DbAccessError::UnsupportedType {
                    id: id.to_string(),
                    db_type: type_tag.to_string(),
                });
            }
        };

        if let Some(existing) = self.cached(id) {
            return Ok(existing);
        }

        let created = match self.factory.connect(db_type, uri).await {
            Ok(driver) => driver,
            Err(err) => {
                tracing::error!(connection = id, db_type = type_tag, error = %err, "driver creation failed");
                return Err(DbAccessError::ConnectionFailed {
                    id: id.to_string(),
                    db_type: type_tag.to_string(),
                });
            }
        };

        let winner = {
            let mut drivers = self.drivers.lock().unwrap_or_else(PoisonError::into_inner);
            match drivers.get(id) {
                Some(existing) => Arc::clone(existing),
                None => {
                    drivers.insert(id.to_string(), Arc::clone(&created));
                    tracing::debug!(connection = id, %db_type, "driver created");
                    return Ok(created);
                }
            }
        };

        tracing::debug!(connection = id, "closing duplicate driver from concurrent creation");
        if let Err(err) = created.close().await {
            tracing::warn!(connection = id, error = %err, "closing duplicate driver failed");
        }
        Ok(winner)
    }

    /// Close and forget every cached driver. Safe to call more than once.
    ///
    /// # Errors
    /// Never fails today; close errors are logged per driver.
    pub async fn close(&self) -> Result<(), DbAccessError> {
        let drained: Vec<(String, Arc<dyn Driver>)> = self
            .drivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "closing cached drivers");
        }
        for (id, driver) in drained {
            if let Err(err) = driver.close().await {
                tracing::warn!(connection = %id, error = %err, "closing driver failed");
            }
        }
        Ok(())
    }
}
