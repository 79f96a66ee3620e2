//! Integration tests for the storage module
//!
//! Pool creation, concurrent checkouts, transactions and health checks
//! against real database files.

#![cfg(feature = "platform")]

use std::sync::Arc;

use tempfile::TempDir;
use unical_common::storage::{SqlitePool, StorageConfig};

fn test_pool(dir: &TempDir) -> SqlitePool {
    SqlitePool::new(StorageConfig::new(dir.path().join("nested/dir/test.db"))).unwrap()
}

#[test]
fn creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir);

    pool.get().unwrap().execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", []).unwrap();

    assert!(dir.path().join("nested/dir/test.db").exists());
}

#[test]
fn concurrent_connections_share_the_database() {
    let dir = TempDir::new().unwrap();
    let pool = Arc::new(test_pool(&dir));
    pool.get()
        .unwrap()
        .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, value TEXT)", [])
        .unwrap();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                let conn = pool.get().unwrap();
                conn.execute("INSERT INTO t (value) VALUES (?1)", [format!("thread_{i}")]).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let count: i64 =
        pool.get().unwrap().query_one("SELECT COUNT(*) FROM t", [], |row| row.get(0)).unwrap();
    assert_eq!(count, 5);
}

#[test]
fn uncommitted_transaction_rolls_back() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir);
    let mut conn = pool.get().unwrap();
    conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", []).unwrap();

    {
        let tx = conn.begin().unwrap();
        tx.execute("INSERT INTO t (id) VALUES (1)", []).unwrap();
        // dropped without commit
    }
    {
        let tx = conn.begin().unwrap();
        tx.execute("INSERT INTO t (id) VALUES (2)", []).unwrap();
        tx.commit().unwrap();
    }

    let ids: Vec<i64> = conn
        .prepare("SELECT id FROM t")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(ids, vec![2]);
}

#[test]
fn health_check_reports_pool_state() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir);

    let health = pool.health_check().unwrap();

    assert_eq!(health.max_size, 4);
    assert!(health.connections >= 1);
    assert!(health.connections_acquired >= 1);
    assert_eq!(health.connection_errors, 0);
}

#[test]
fn foreign_keys_are_enforced_on_every_connection() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir);
    let conn = pool.get().unwrap();
    conn.execute_batch(
        "CREATE TABLE parent (id INTEGER PRIMARY KEY);
         CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id));",
    )
    .unwrap();

    let err = conn.execute("INSERT INTO child (parent_id) VALUES (42)", []);
    assert!(err.is_err());
}
