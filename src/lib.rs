//! Storage facade over interchangeable SQL backends.
//!
//! A host application issues SQL against an embedded SQLite file or a
//! networked MySQL/MariaDB server through one uniform API. Statements run
//! either inline ([`ExecMode::Sync`], the call completes when the statement
//! does) or fire-and-forget on an injected task executor
//! ([`ExecMode::Async`]); query results are delivered to a
//! [`QueryCallback`] exactly once in both modes.
//!
//! ```no_run
//! use sqlstore::{ExecMode, StorageConfig, StorageManager};
//! use std::sync::Arc;
//!
//! # async fn demo() -> sqlstore::StorageResult<()> {
//! let manager = StorageManager::initialize(StorageConfig::default()).await?;
//! manager
//!     .execute("CREATE TABLE IF NOT EXISTS kv (k TEXT, v TEXT)", ExecMode::Sync)
//!     .await?;
//! manager
//!     .query(
//!         "SELECT v FROM kv",
//!         Arc::new(|result: sqlstore::StorageResult<sqlstore::RowSet>| {
//!             if let Ok(rows) = result {
//!                 println!("{} rows", rows.len());
//!             }
//!         }),
//!         ExecMode::Async,
//!     )
//!     .await?;
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod manager;
pub mod rows;
pub mod statement;

pub use callback::QueryCallback;
pub use config::{BackendKind, PoolSettings, StorageConfig};
pub use driver::{ExecMode, PooledConnection, StorageDriver};
pub use error::{StorageError, StorageResult};
pub use executor::{TaskExecutor, TokioSpawner};
pub use manager::StorageManager;
pub use rows::RowSet;
pub use statement::{SqlParam, Statement};
