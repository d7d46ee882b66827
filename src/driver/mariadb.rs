//! MariaDB driver.
//!
//! Identical to the MySQL driver apart from its kind and the `mariadb` URI
//! scheme; the wire protocol is shared.

use crate::callback::QueryCallback;
use crate::config::{BackendKind, StorageConfig};
use crate::driver::network::NetworkedCore;
use crate::driver::{ExecMode, PooledConnection, StorageDriver};
use crate::error::StorageResult;
use crate::executor::TaskExecutor;
use crate::statement::Statement;
use async_trait::async_trait;
use std::sync::Arc;

/// Driver for a networked MariaDB server, dialed under the `mariadb` scheme.
pub struct MariaDbDriver {
    core: NetworkedCore,
}

impl MariaDbDriver {
    pub fn new(config: StorageConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            core: NetworkedCore::new(BackendKind::MariaDB, config, executor),
        }
    }
}

#[async_trait]
impl StorageDriver for MariaDbDriver {
    fn kind(&self) -> BackendKind {
        self.core.kind()
    }

    async fn setup(&self) -> StorageResult<()> {
        self.core.setup().await
    }

    async fn connect(&self) -> StorageResult<PooledConnection> {
        self.core.connect().await
    }

    async fn execute(&self, statement: Statement, mode: ExecMode) -> StorageResult<()> {
        self.core.execute(statement, mode).await
    }

    async fn execute_query(
        &self,
        statement: Statement,
        callback: Arc<dyn QueryCallback>,
        mode: ExecMode,
    ) -> StorageResult<()> {
        self.core.execute_query(statement, callback, mode).await
    }

    async fn test(&self) -> StorageResult<()> {
        self.core.test().await
    }

    async fn shutdown(&self) -> StorageResult<()> {
        self.core.shutdown().await
    }
}
