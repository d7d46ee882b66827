//! Callback-based result delivery.

use crate::error::StorageResult;
use crate::rows::RowSet;

/// Single-method capability invoked exactly once per completed query.
///
/// For synchronous queries the callback runs on the caller's task and only
/// sees `Ok` - failures propagate to the caller instead. For asynchronous
/// queries it runs on the task executor's worker context and failures
/// arrive as the `Err` arm, so they are never lost.
pub trait QueryCallback: Send + Sync {
    fn on_result(&self, result: StorageResult<RowSet>);
}

impl<F> QueryCallback for F
where
    F: Fn(StorageResult<RowSet>) + Send + Sync,
{
    fn on_result(&self, result: StorageResult<RowSet>) {
        self(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_callback() {
        let calls = AtomicUsize::new(0);
        let callback = |result: StorageResult<RowSet>| {
            assert!(result.is_ok());
            calls.fetch_add(1, Ordering::SeqCst);
        };
        callback.on_result(Ok(RowSet::default()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
