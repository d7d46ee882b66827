//! Storage drivers.
//!
//! One driver per backend kind, all implementing the [`StorageDriver`]
//! capability set. The embedded backend opens a local file; the networked
//! backends dial a server through a bounded connection pool. Every
//! execution checks a connection out of the driver's pool and returns it on
//! scope exit, for all backends.

pub mod mariadb;
pub mod mysql;
pub(crate) mod network;
pub mod sqlite;

pub use mariadb::MariaDbDriver;
pub use mysql::MySqlDriver;
pub use sqlite::SqliteDriver;

use crate::callback::QueryCallback;
use crate::config::BackendKind;
use crate::error::StorageResult;
use crate::statement::Statement;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{MySql, Sqlite};
use std::sync::Arc;

/// Probe statement run by [`StorageDriver::test`].
pub(crate) const TEST_QUERY: &str = "SELECT 1";

/// How a statement is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Run inline; the call completes when the statement completes.
    Sync,
    /// Hand the statement to the task executor and return immediately. No
    /// completion signal is given; query results still arrive through the
    /// callback.
    Async,
}

/// A live connection checked out of a driver's pool.
///
/// Returns to its pool when dropped. Both networked backends speak the
/// MySQL wire protocol, so they share a variant.
#[derive(Debug)]
pub enum PooledConnection {
    SQLite(PoolConnection<Sqlite>),
    MySql(PoolConnection<MySql>),
}

impl PooledConnection {
    /// The backend family this connection belongs to.
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::SQLite(_))
    }
}

/// Capability set implemented by every backend driver.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// The backend kind this driver serves.
    fn kind(&self) -> BackendKind;

    /// Idempotent backend initialization. Must complete before any other
    /// operation; calling execute or query first fails with
    /// [`StorageError::NotInitialized`](crate::StorageError::NotInitialized).
    async fn setup(&self) -> StorageResult<()>;

    /// Check a live connection out of the pool. A pool closed by
    /// [`shutdown`](Self::shutdown) is rebuilt first, so the handle is
    /// always open.
    async fn connect(&self) -> StorageResult<PooledConnection>;

    /// Run a non-result-producing statement.
    async fn execute(&self, statement: Statement, mode: ExecMode) -> StorageResult<()>;

    /// Run a result-producing statement. The materialized rows are
    /// delivered to `callback` exactly once: on the caller's task for
    /// [`ExecMode::Sync`], on the executor's worker context for
    /// [`ExecMode::Async`].
    async fn execute_query(
        &self,
        statement: Statement,
        callback: Arc<dyn QueryCallback>,
        mode: ExecMode,
    ) -> StorageResult<()>;

    /// Build an unexecuted statement handle.
    fn prepare(&self, sql: &str) -> Statement {
        Statement::new(sql)
    }

    /// Probe the backend with `SELECT 1` on a fresh checkout.
    async fn test(&self) -> StorageResult<()>;

    /// Close the tracked pool if open. Idempotent; a later
    /// [`connect`](Self::connect) opens a fresh pool.
    async fn shutdown(&self) -> StorageResult<()>;
}
