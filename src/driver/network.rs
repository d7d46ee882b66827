//! Shared implementation for the networked backends.
//!
//! MySQL and MariaDB differ only in backend kind and URI scheme; everything
//! else - pool construction, statement execution, sync/async dispatch -
//! lives here. The dial itself always goes through the MySQL wire protocol.

use crate::callback::QueryCallback;
use crate::config::{BackendKind, StorageConfig};
use crate::driver::{ExecMode, PooledConnection, TEST_QUERY};
use crate::error::{StorageError, StorageResult};
use crate::executor::TaskExecutor;
use crate::rows::RowSet;
use crate::statement::{SqlParam, Statement};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, MySqlPool};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub(crate) struct NetworkedCore {
    kind: BackendKind,
    config: StorageConfig,
    executor: Arc<dyn TaskExecutor>,
    pool: tokio::sync::RwLock<Option<MySqlPool>>,
}

impl NetworkedCore {
    pub(crate) fn new(
        kind: BackendKind,
        config: StorageConfig,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            kind,
            config,
            executor,
            pool: tokio::sync::RwLock::new(None),
        }
    }

    pub(crate) fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Build the backend connection URI `scheme://host:port/database`, with
    /// the passthrough properties as its query string. Credentials are not
    /// part of this URI; it is safe to log.
    pub(crate) fn connection_url(&self) -> StorageResult<url::Url> {
        let scheme = self.kind.scheme().ok_or_else(|| {
            StorageError::configuration(format!("{} is not a networked backend", self.kind))
        })?;
        let mut url = url::Url::parse(&format!(
            "{}://{}:{}/{}",
            scheme, self.config.host, self.config.port, self.config.database
        ))
        .map_err(|e| StorageError::configuration(format!("invalid connection URI: {}", e)))?;

        let props = self.config.passthrough_properties();
        if !props.is_empty() {
            url.query_pairs_mut().extend_pairs(props);
        }
        Ok(url)
    }

    fn build_pool(&self) -> StorageResult<MySqlPool> {
        let settings = self.config.pool_settings();
        let url = self.connection_url()?;

        // Dial under the mysql scheme regardless of the backend's own URI
        // scheme; MariaDB speaks the same wire protocol.
        let mut dial = url.clone();
        dial.set_scheme("mysql")
            .map_err(|_| StorageError::internal("cannot rewrite connection URI scheme"))?;
        dial.set_username(&self.config.username)
            .map_err(|_| StorageError::configuration("invalid username for connection URI"))?;
        if !self.config.password.is_empty() {
            dial.set_password(Some(&self.config.password))
                .map_err(|_| StorageError::configuration("invalid password for connection URI"))?;
        }

        let options = MySqlConnectOptions::from_str(dial.as_str()).map_err(|e| {
            StorageError::connectivity(
                format!("invalid {} connection options: {}", self.kind, e),
                "Check host, port and database in the storage settings",
            )
        })?;

        let pool = MySqlPoolOptions::new()
            .min_connections(settings.min_connections_or_default())
            .max_connections(settings.max_connections_or_default(false))
            .idle_timeout(Some(Duration::from_secs(settings.idle_timeout_or_default())))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_or_default()))
            .test_before_acquire(settings.test_before_acquire_or_default())
            .connect_lazy_with(options);
        Ok(pool)
    }

    /// Reuse the stored pool if open, rebuild it if a shutdown closed it.
    async fn pool_handle(&self, operation: &str) -> StorageResult<MySqlPool> {
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
                debug!(backend = %self.kind, "reopening connection pool");
                let pool = self.build_pool()?;
                *slot = Some(pool.clone());
                Ok(pool)
            }
            None => Err(StorageError::not_initialized(operation)),
        }
    }

    pub(crate) async fn setup(&self) -> StorageResult<()> {
        self.config
            .pool_settings()
            .validate()
            .map_err(StorageError::configuration)?;

        let url = self.connection_url()?;
        let mut slot = self.pool.write().await;
        if slot.is_none() {
            info!(backend = %self.kind, url = %url, "configured connection pool");
            *slot = Some(self.build_pool()?);
        }
        Ok(())
    }

    pub(crate) async fn connect(&self) -> StorageResult<PooledConnection> {
        let pool = self.pool_handle("connect").await?;
        let conn = pool.acquire().await?;
        Ok(PooledConnection::MySql(conn))
    }

    pub(crate) async fn execute(&self, statement: Statement, mode: ExecMode) -> StorageResult<()> {
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

    pub(crate) async fn execute_query(
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

    pub(crate) async fn test(&self) -> StorageResult<()> {
        let pool = self.pool_handle("test").await?;
        let mut conn = pool.acquire().await?;
        sqlx::query(TEST_QUERY).execute(&mut *conn).await?;
        Ok(())
    }

    pub(crate) async fn shutdown(&self) -> StorageResult<()> {
        let slot = self.pool.read().await;
        if let Some(pool) = slot.as_ref() {
            if !pool.is_closed() {
                pool.close().await;
            }
        }
        Ok(())
    }
}

async fn run_execute(pool: &MySqlPool, statement: &Statement) -> StorageResult<()> {
    let mut conn = pool.acquire().await?;
    bind_params(sqlx::query(statement.sql()), statement.params())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn run_query(pool: &MySqlPool, statement: &Statement) -> StorageResult<RowSet> {
    let mut conn = pool.acquire().await?;
    let rows = bind_params(sqlx::query(statement.sql()), statement.params())
        .fetch_all(&mut *conn)
        .await?;
    Ok(RowSet::from_mysql(rows))
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TokioSpawner;

    fn core_for(kind: BackendKind, config: StorageConfig) -> NetworkedCore {
        NetworkedCore::new(kind, config, Arc::new(TokioSpawner))
    }

    #[test]
    fn test_connection_url_format() {
        let config = StorageConfig::new(BackendKind::MySQL)
            .with_host("db.internal")
            .with_port(3307)
            .with_database("inventory");
        let core = core_for(BackendKind::MySQL, config);
        assert_eq!(
            core.connection_url().unwrap().as_str(),
            "mysql://db.internal:3307/inventory"
        );
    }

    #[test]
    fn test_connection_url_uses_backend_scheme() {
        let config = StorageConfig::new(BackendKind::MariaDB);
        let core = core_for(BackendKind::MariaDB, config);
        let url = core.connection_url().unwrap();
        assert_eq!(url.scheme(), "mariadb");
        assert_eq!(url.as_str(), "mariadb://localhost:3306/storage");
    }

    #[test]
    fn test_connection_url_carries_passthrough_properties() {
        let mut config = StorageConfig::new(BackendKind::MySQL);
        config.add_property("charset", "utf8mb4");
        config.add_property("max_connections", "20");
        let core = core_for(BackendKind::MySQL, config);
        let url = core.connection_url().unwrap();
        assert!(url.query().unwrap().contains("charset=utf8mb4"));
        assert!(!url.as_str().contains("max_connections"));
    }

    #[test]
    fn test_connection_url_excludes_credentials() {
        let config = StorageConfig::new(BackendKind::MySQL).with_credentials("svc", "secret");
        let core = core_for(BackendKind::MySQL, config);
        let url = core.connection_url().unwrap();
        assert!(!url.as_str().contains("secret"));
        assert!(!url.as_str().contains("svc"));
    }

    #[tokio::test]
    async fn test_setup_rejects_invalid_pool_settings() {
        let mut config = StorageConfig::new(BackendKind::MySQL);
        config.add_property("max_connections", "0");
        let core = core_for(BackendKind::MySQL, config);
        let err = core.setup().await.unwrap_err();
        assert!(matches!(err, StorageError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_operations_before_setup_fail() {
        let core = core_for(BackendKind::MySQL, StorageConfig::new(BackendKind::MySQL));
        let err = core.test().await.unwrap_err();
        assert!(matches!(err, StorageError::NotInitialized { .. }));
    }
}
