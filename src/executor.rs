//! Task-scheduler collaborator for fire-and-forget execution.
//!
//! Asynchronous driver operations hand their work to a [`TaskExecutor`]
//! instead of assuming a particular runtime. The contract is deliberately
//! thin: one submit operation, no completion signal, no cancellation.

use futures_util::future::BoxFuture;

/// Accepts a unit of work and runs it off the calling task at an
/// unspecified later time.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, task: BoxFuture<'static, ()>);
}

/// Default executor backed by the ambient tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl TaskExecutor for TokioSpawner {
    fn submit(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}
