//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 延迟写入测试

#[path = "../common/mod.rs"]
mod common;

use chrono::Duration;
use common::{memory_pool, setup_logging, FlakyStore};
use oxpool::store::{MemoryStore, StoreClient};
use oxpool::CachePool;
use std::sync::Arc;

#[tokio::test]
async fn test_deferred_items_invisible_until_commit() {
    setup_logging();
    let store = MemoryStore::new();
    let mut writer = memory_pool(&store);
    let mut reader = memory_pool(&store);

    let mut baz = writer.get_item("baz").await.unwrap();
    baz.set("baz value".to_string())
        .expires_after(Duration::seconds(100));
    writer.save_deferred(baz);

    let mut foo = writer.get_item("foo").await.unwrap();
    foo.set("new foo value".to_string())
        .expires_after(Duration::minutes(1));
    writer.save_deferred(foo);

    let mut bat = writer.get_item("bat").await.unwrap();
    bat.set("bat value".to_string())
        .expires_after(Duration::minutes(-1));
    writer.save_deferred(bat);

    assert_eq!(writer.deferred_len(), 3);
    let before = reader.get_items(["foo", "baz", "bat"]).await.unwrap();
    assert!(before.values().all(|item| !item.is_hit()));
    assert!(store.is_empty());

    writer.commit().await.unwrap();
    assert_eq!(writer.deferred_len(), 0);

    let after = reader.get_items(["foo", "baz", "bat"]).await.unwrap();
    assert_eq!(after["foo"].get().map(String::as_str), Some("new foo value"));
    assert_eq!(after["baz"].get().map(String::as_str), Some("baz value"));
    assert!(!after["bat"].is_hit());
    assert_eq!(after["bat"].get(), None);
}

#[tokio::test]
async fn test_later_deferred_save_overwrites_pending() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    let mut first = pool.get_item("k").await.unwrap();
    first.set("first".to_string());
    pool.save_deferred(first);

    let mut second = pool.get_item("k").await.unwrap();
    second.set("second".to_string());
    pool.save_deferred(second);

    assert_eq!(pool.deferred_len(), 1);
    pool.commit().await.unwrap();
    assert_eq!(
        pool.get_item("k").await.unwrap().get().map(String::as_str),
        Some("second")
    );
}

#[tokio::test]
async fn test_empty_commit_succeeds() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);
    pool.commit().await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_failed_commit_can_be_retried() {
    let store = MemoryStore::new();
    let mut pool: CachePool<String> =
        CachePool::new(Arc::new(FlakyStore::new(store.clone(), 1)));

    let mut item = pool.get_item("retry").await.unwrap();
    item.set("value".to_string());
    pool.save_deferred(item);

    assert!(pool.commit().await.is_err());
    assert_eq!(pool.deferred_len(), 1);
    assert!(store.is_empty());

    pool.commit().await.unwrap();
    assert_eq!(pool.deferred_len(), 0);
    assert!(store.get("retry").await.unwrap().is_some());
}

#[tokio::test]
async fn test_commit_releases_stampede_locks() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    let mut item = pool.get_item("k").await.unwrap();
    item.set("old".to_string())
        .expires_after(Duration::seconds(-5));
    pool.save(&item).await.unwrap();

    pool.set_stampede_protection(true);
    let mut item = pool.get_item("k").await.unwrap();
    assert!(!item.is_hit());
    assert_eq!(pool.held_lock_count(), 1);

    item.set("new".to_string())
        .expires_after(Duration::seconds(60));
    pool.save_deferred(item);
    // 提交前锁仍然存在
    assert!(store.get("*lock*k").await.unwrap().is_some());

    pool.commit().await.unwrap();
    assert_eq!(pool.held_lock_count(), 0);
    assert_eq!(store.get("*lock*k").await.unwrap(), None);
}

#[tokio::test]
async fn test_delete_drops_pending_deferred_item() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    let mut item = pool.get_item("gone").await.unwrap();
    item.set("value".to_string());
    pool.save_deferred(item);

    pool.delete_item("gone").await.unwrap();
    pool.commit().await.unwrap();
    assert!(!pool.has_item("gone").await.unwrap());
}
