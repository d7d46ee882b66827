//! The storage facade.
//!
//! [`StorageManager`] owns one driver per backend kind and forwards every
//! public operation to the one selected by configuration.

use crate::callback::QueryCallback;
use crate::config::{BackendKind, StorageConfig};
use crate::driver::{
    ExecMode, MariaDbDriver, MySqlDriver, PooledConnection, SqliteDriver, StorageDriver,
};
use crate::error::{StorageError, StorageResult};
use crate::executor::{TaskExecutor, TokioSpawner};
use crate::statement::Statement;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Facade over the backend drivers.
///
/// Construction builds the full kind-to-driver registry eagerly (driver
/// construction performs no I/O), selects the active driver by
/// `config.backend` and runs `setup()` then `test()` on it; a failure of
/// either is fatal and propagates.
pub struct StorageManager {
    drivers: HashMap<BackendKind, Arc<dyn StorageDriver>>,
    active: Arc<dyn StorageDriver>,
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("active", &self.active.kind())
            .finish()
    }
}

impl StorageManager {
    /// Initialize with the default tokio-backed task executor.
    pub async fn initialize(config: StorageConfig) -> StorageResult<Self> {
        Self::initialize_with(config, Arc::new(TokioSpawner)).await
    }

    /// Initialize with a custom task executor for asynchronous dispatch.
    pub async fn initialize_with(
        config: StorageConfig,
        executor: Arc<dyn TaskExecutor>,
    ) -> StorageResult<Self> {
        let mut drivers: HashMap<BackendKind, Arc<dyn StorageDriver>> = HashMap::new();
        for kind in BackendKind::ALL {
            let driver: Arc<dyn StorageDriver> = match kind {
                BackendKind::SQLite => {
                    Arc::new(SqliteDriver::new(config.clone(), Arc::clone(&executor)))
                }
                BackendKind::MySQL => {
                    Arc::new(MySqlDriver::new(config.clone(), Arc::clone(&executor)))
                }
                BackendKind::MariaDB => {
                    Arc::new(MariaDbDriver::new(config.clone(), Arc::clone(&executor)))
                }
            };
            drivers.insert(kind, driver);
        }

        let active = drivers.get(&config.backend).cloned().ok_or_else(|| {
            StorageError::configuration(format!(
                "no driver registered for backend {}",
                config.backend
            ))
        })?;

        info!(backend = %config.backend, "initializing storage");
        active.setup().await?;
        active.test().await?;

        Ok(Self { drivers, active })
    }

    /// The backend kind served by the active driver.
    pub fn backend(&self) -> BackendKind {
        self.active.kind()
    }

    /// Look up a driver in the registry.
    pub fn driver(&self, kind: BackendKind) -> Option<&Arc<dyn StorageDriver>> {
        self.drivers.get(&kind)
    }

    /// Check a live connection out of the active driver's pool.
    pub async fn connect(&self) -> StorageResult<PooledConnection> {
        self.active.connect().await
    }

    /// Build an unexecuted statement handle.
    pub fn prepare(&self, sql: &str) -> Statement {
        self.active.prepare(sql)
    }

    /// Run a non-result-producing statement from raw SQL.
    pub async fn execute(&self, sql: &str, mode: ExecMode) -> StorageResult<()> {
        self.active.execute(Statement::new(sql), mode).await
    }

    /// Run a non-result-producing prepared statement.
    pub async fn execute_statement(
        &self,
        statement: Statement,
        mode: ExecMode,
    ) -> StorageResult<()> {
        self.active.execute(statement, mode).await
    }

    /// Run a query from raw SQL; rows are delivered to `callback` exactly
    /// once.
    pub async fn query(
        &self,
        sql: &str,
        callback: Arc<dyn QueryCallback>,
        mode: ExecMode,
    ) -> StorageResult<()> {
        self.active
            .execute_query(Statement::new(sql), callback, mode)
            .await
    }

    /// Run a prepared-statement query; rows are delivered to `callback`
    /// exactly once.
    pub async fn query_statement(
        &self,
        statement: Statement,
        callback: Arc<dyn QueryCallback>,
        mode: ExecMode,
    ) -> StorageResult<()> {
        self.active.execute_query(statement, callback, mode).await
    }

    /// Close the active driver's pool. Idempotent; a later
    /// [`connect`](Self::connect) opens a fresh pool.
    pub async fn shutdown(&self) -> StorageResult<()> {
        self.active.shutdown().await
    }
}
