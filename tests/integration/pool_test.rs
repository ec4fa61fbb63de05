//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存池基本读写测试（内存存储）

#[path = "../common/mod.rs"]
mod common;

use chrono::Duration;
use common::{memory_pool, setup_logging, ManualClock};
use oxpool::store::{MemoryStore, StoreClient};
use oxpool::CachePool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[tokio::test]
async fn test_round_trip_with_future_expiration() {
    setup_logging();
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    let mut item = pool.get_item("foo").await.unwrap();
    assert!(!item.is_hit());
    assert_eq!(item.get(), None);

    item.set("v1".to_string()).expires_after(Duration::seconds(300));
    pool.save(&item).await.unwrap();

    let item = pool.get_item("foo").await.unwrap();
    assert!(item.is_hit());
    assert_eq!(item.get().map(String::as_str), Some("v1"));
}

#[tokio::test]
async fn test_round_trip_without_expiration() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    let mut item = pool.get_item("forever").await.unwrap();
    item.set("value".to_string());
    pool.save(&item).await.unwrap();

    let item = pool.get_item("forever").await.unwrap();
    assert!(item.is_hit());
    assert_eq!(item.expiration(), None);
}

#[tokio::test]
async fn test_past_expiration_is_miss_without_protection() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    let mut item = pool.get_item("bat").await.unwrap();
    item.set("bat value".to_string())
        .expires_after(Duration::seconds(-60));
    pool.save(&item).await.unwrap();

    let item = pool.get_item("bat").await.unwrap();
    assert!(!item.is_hit());
    assert_eq!(item.get(), None);
    assert_eq!(pool.held_lock_count(), 0);
}

#[tokio::test]
async fn test_expiration_follows_injected_clock() {
    let store = MemoryStore::new();
    let clock = ManualClock::new();
    let mut pool: CachePool<String> =
        CachePool::new(Arc::new(store.clone())).with_clock(clock.clone());

    let mut item = pool.get_item("k").await.unwrap();
    item.set("v".to_string()).expires_after(Duration::seconds(30));
    pool.save(&item).await.unwrap();
    assert!(pool.get_item("k").await.unwrap().is_hit());

    clock.advance(Duration::seconds(31));
    assert!(!pool.get_item("k").await.unwrap().is_hit());
    assert!(!pool.has_item("k").await.unwrap());
}

#[tokio::test]
async fn test_malformed_entries_are_misses() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    store.set("garbage", b"\x00\x01\x02".to_vec()).await.unwrap();
    store
        .set("three_fields", br#"{"v":"x","t":null,"extra":1}"#.to_vec())
        .await
        .unwrap();
    store
        .set("wrong_type", br#"{"v":12,"t":null}"#.to_vec())
        .await
        .unwrap();
    store
        .set("bad_time", br#"{"v":"x","t":"yesterday"}"#.to_vec())
        .await
        .unwrap();

    for key in ["garbage", "three_fields", "wrong_type", "bad_time"] {
        let item = pool.get_item(key).await.unwrap();
        assert!(!item.is_hit(), "{} should be a miss", key);
        assert_eq!(item.raw_value(), None);
    }
}

#[tokio::test]
async fn test_get_items_returns_every_key() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    for (key, value) in [("foo", "foo value"), ("bar", "bar value")] {
        let mut item = pool.get_item(key).await.unwrap();
        item.set(value.to_string()).expires_after(Duration::minutes(5));
        pool.save(&item).await.unwrap();
    }

    let items = pool.get_items(["foo", "bar", "missing"]).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items["foo"].get().map(String::as_str), Some("foo value"));
    assert_eq!(items["bar"].get().map(String::as_str), Some("bar value"));
    assert!(!items["missing"].is_hit());
}

#[tokio::test]
async fn test_update_existing_item_keeps_other_keys() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    for (key, value) in [("foo", "foo value"), ("bar", "bar value")] {
        let mut item = pool.get_item(key).await.unwrap();
        item.set(value.to_string());
        pool.save(&item).await.unwrap();
    }

    let mut items = pool.get_items(["foo", "bar"]).await.unwrap();
    if let Some(bar) = items.get_mut("bar") {
        bar.set("new bar value".to_string());
    }
    for item in items.values() {
        pool.save(item).await.unwrap();
    }

    let items = pool.get_items(["foo", "bar"]).await.unwrap();
    assert_eq!(items["foo"].get().map(String::as_str), Some("foo value"));
    assert_eq!(items["bar"].get().map(String::as_str), Some("new bar value"));
}

#[tokio::test]
async fn test_delete_and_clear() {
    let store = MemoryStore::new();
    let mut pool = memory_pool(&store);

    for key in ["a", "b", "c"] {
        let mut item = pool.get_item(key).await.unwrap();
        item.set(key.to_uppercase());
        pool.save(&item).await.unwrap();
    }

    pool.delete_items(["a", "b"]).await.unwrap();
    assert!(!pool.has_item("a").await.unwrap());
    assert!(!pool.has_item("b").await.unwrap());
    assert!(pool.has_item("c").await.unwrap());

    pool.delete_item("c").await.unwrap();
    assert!(!pool.has_item("c").await.unwrap());

    let mut item = pool.get_item("d").await.unwrap();
    item.set("D".to_string());
    pool.save(&item).await.unwrap();
    assert!(pool.clear().await.unwrap());
    assert!(store.is_empty());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Report {
    id: u64,
    rows: Vec<String>,
}

#[tokio::test]
async fn test_structured_values() {
    let store = MemoryStore::new();
    let mut pool: CachePool<Report> = CachePool::new(Arc::new(store.clone()));

    let report = Report {
        id: 7,
        rows: vec!["a".into(), "b".into()],
    };
    let mut item = pool.get_item("report:7").await.unwrap();
    item.set(report.clone());
    pool.save(&item).await.unwrap();

    let item = pool.get_item("report:7").await.unwrap();
    assert_eq!(item.into_value(), Some(report));

    // 同一个键用不兼容的类型读取视为未命中
    let mut other: CachePool<u64> = CachePool::new(Arc::new(store));
    assert!(!other.get_item("report:7").await.unwrap().is_hit());
}
