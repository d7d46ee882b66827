//! SQLite driver for the embedded backend.

use crate::callback::QueryCallback;
use crate::config::{BackendKind, StorageConfig};
use crate::driver::{ExecMode, PooledConnection, StorageDriver, TEST_QUERY};
use crate::error::{StorageError, StorageResult};
use crate::executor::TaskExecutor;
use crate::rows::RowSet;
use crate::statement::{SqlParam, Statement};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Driver for the embedded file-based backend.
///
/// `setup()` creates the containing directory; the database file itself is
/// created on first connection.
pub struct SqliteDriver {
    config: StorageConfig,
    executor: Arc<dyn TaskExecutor>,
    pool: RwLock<Option<SqlitePool>>,
}

impl SqliteDriver {
    pub fn new(config: StorageConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            config,
            executor,
            pool: RwLock::new(None),
        }
    }

    /// Path of the database file: `local_file_name` plus the `.db` suffix.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.db", self.config.local_file_name))
    }

    fn build_pool(&self) -> SqlitePool {
        let settings = self.config.pool_settings();
        let options = SqliteConnectOptions::new()
            .filename(self.database_path())
            .create_if_missing(true);

        SqlitePoolOptions::new()
            .min_connections(settings.min_connections_or_default())
            .max_connections(settings.max_connections_or_default(true))
            .idle_timeout(Some(Duration::from_secs(settings.idle_timeout_or_default())))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_or_default()))
            .test_before_acquire(settings.test_before_acquire_or_default())
            .connect_lazy_with(options)
    }

    /// Reuse the stored pool if open, rebuild it if a shutdown closed it.
    async fn pool_handle(&self, operation: &str) -> StorageResult<SqlitePool> {
        {
            let slot = self.pool.read().await;
            match slot.as_ref() {
                Some(pool) if !pool.is_closed() => return Ok(pool.clone()),
                Some(_) => {}
                None => return Err(StorageError::not_initialized(operation)),
            }
        }

        let mut slot = self.pool.write().await;
        // Re-check under the write lock: another task may have rebuilt the
        // pool while we waited.
        match slot.as_ref() {
            Some(pool) if !pool.is_closed() => Ok(pool.clone()),
            Some(_) => {
                debug!(path = %self.database_path().display(), "reopening database file");
                let pool = self.build_pool();
                *slot = Some(pool.clone());
                Ok(pool)
            }
            None => Err(StorageError::not_initialized(operation)),
        }
    }
}

#[async_trait]
impl StorageDriver for SqliteDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::SQLite
    }

    async fn setup(&self) -> StorageResult<()> {
        self.config
            .pool_settings()
            .validate()
            .map_err(StorageError::configuration)?;

        let path = self.database_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::configuration(format!(
                        "cannot create data directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut slot = self.pool.write().await;
        if slot.is_none() {
            info!(path = %path.display(), "configured embedded database");
            *slot = Some(self.build_pool());
        }
        Ok(())
    }

    async fn connect(&self) -> StorageResult<PooledConnection> {
        let pool = self.pool_handle("connect").await?;
        let conn = pool.acquire().await?;
        Ok(PooledConnection::SQLite(conn))
    }

    async fn execute(&self, statement: Statement, mode: ExecMode) -> StorageResult<()> {
        let pool = self.pool_handle("execute").await?;
        match mode {
            ExecMode::Sync => run_execute(&pool, &statement).await,
            ExecMode::Async => {
                self.executor.submit(Box::pin(async move {
                    if let Err(e) = run_execute(&pool, &statement).await {
                        error!(sql = %statement.sql(), error = %e, "asynchronous statement failed");
                    }
                }));
                Ok(())
            }
        }
    }

    async fn execute_query(
        &self,
        statement: Statement,
        callback: Arc<dyn QueryCallback>,
        mode: ExecMode,
    ) -> StorageResult<()> {
        let pool = self.pool_handle("execute_query").await?;
        match mode {
            ExecMode::Sync => {
                let rows = run_query(&pool, &statement).await?;
                callback.on_result(Ok(rows));
                Ok(())
            }
            ExecMode::Async => {
                self.executor.submit(Box::pin(async move {
                    callback.on_result(run_query(&pool, &statement).await);
                }));
                Ok(())
            }
        }
    }

    async fn test(&self) -> StorageResult<()> {
        let pool = self.pool_handle("test").await?;
        let mut conn = pool.acquire().await?;
        sqlx::query(TEST_QUERY).execute(&mut *conn).await?;
        Ok(())
    }

    async fn shutdown(&self) -> StorageResult<()> {
        let slot = self.pool.read().await;
        if let Some(pool) = slot.as_ref() {
            if !pool.is_closed() {
                pool.close().await;
            }
        }
        Ok(())
    }
}

async fn run_execute(pool: &SqlitePool, statement: &Statement) -> StorageResult<()> {
    let mut conn = pool.acquire().await?;
    bind_params(sqlx::query(statement.sql()), statement.params())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn run_query(pool: &SqlitePool, statement: &Statement) -> StorageResult<RowSet> {
    let mut conn = pool.acquire().await?;
    let rows = bind_params(sqlx::query(statement.sql()), statement.params())
        .fetch_all(&mut *conn)
        .await?;
    Ok(RowSet::from_sqlite(rows))
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_str()),
            SqlParam::Bytes(v) => query.bind(v.as_slice()),
        };
    }
    query
}
