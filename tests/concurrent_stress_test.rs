use rand::Rng;
use sqlstore::{ExecMode, RowSet, StorageConfig, StorageManager, StorageResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

const PARALLEL_QUERIES: usize = 16;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn sqlite_config(dir: &TempDir) -> StorageConfig {
    let mut config = StorageConfig::default()
        .with_local_file_name(dir.path().join("data").to_str().unwrap().to_string());
    config.add_property("max_connections", "4");
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_sync_queries_share_the_pool() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(StorageManager::initialize(sqlite_config(&dir)).await.unwrap());

    manager
        .execute("CREATE TABLE items (id INTEGER PRIMARY KEY)", ExecMode::Sync)
        .await
        .unwrap();
    manager
        .execute("INSERT INTO items (id) VALUES (1)", ExecMode::Sync)
        .await
        .unwrap();

    let delivered = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..PARALLEL_QUERIES {
        let manager = Arc::clone(&manager);
        let delivered = Arc::clone(&delivered);
        handles.push(tokio::spawn(async move {
            let jitter = rand::thread_rng().gen_range(0..5);
            tokio::time::sleep(Duration::from_millis(jitter)).await;
            manager
                .query(
                    "SELECT id FROM items",
                    Arc::new(move |result: StorageResult<RowSet>| {
                        assert_eq!(result.unwrap().len(), 1);
                        delivered.fetch_add(1, Ordering::SeqCst);
                    }),
                    ExecMode::Sync,
                )
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(delivered.load(Ordering::SeqCst), PARALLEL_QUERIES);

    // The pool is still healthy afterwards.
    manager
        .execute("INSERT INTO items (id) VALUES (2)", ExecMode::Sync)
        .await
        .unwrap();
    manager.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_async_queries_all_deliver() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(StorageManager::initialize(sqlite_config(&dir)).await.unwrap());

    let delivered = Arc::new(AtomicUsize::new(0));
    for _ in 0..PARALLEL_QUERIES {
        let delivered = Arc::clone(&delivered);
        manager
            .query(
                "SELECT 1 AS one",
                Arc::new(move |result: StorageResult<RowSet>| {
                    assert!(result.is_ok());
                    delivered.fetch_add(1, Ordering::SeqCst);
                }),
                ExecMode::Async,
            )
            .await
            .unwrap();
    }

    tokio::time::timeout(Duration::from_secs(10), async {
        while delivered.load(Ordering::SeqCst) < PARALLEL_QUERIES {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("not every asynchronous callback was delivered");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_connects_after_shutdown_rebuild_one_pool() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(StorageManager::initialize(sqlite_config(&dir)).await.unwrap());
    manager.shutdown().await.unwrap();

    // Both tasks observe a closed pool and race to rebuild it; the write
    // lock re-check means neither gets a stale or half-open handle.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move { manager.connect().await.is_ok() }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    manager
        .execute("CREATE TABLE after_rebuild (n INTEGER)", ExecMode::Sync)
        .await
        .unwrap();
}
