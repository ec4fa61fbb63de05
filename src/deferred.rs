//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了延迟写入队列。

use crate::item::CacheItem;
use std::collections::HashMap;

/// 延迟写入队列
///
/// 按缓存键保存最后一次排队的缓存项，同一键的新项覆盖旧项。
/// 入队不访问存储，由缓存池在提交时一次性写入。
#[derive(Debug)]
pub struct DeferredQueue<T> {
    items: HashMap<String, CacheItem<T>>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队，返回被覆盖的旧项
    pub fn insert(&mut self, item: CacheItem<T>) -> Option<CacheItem<T>> {
        self.items.insert(item.key().to_string(), item)
    }

    pub fn get(&self, key: &str) -> Option<&CacheItem<T>> {
        self.items.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheItem<T>> {
        self.items.remove(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 取出全部待写入项，队列变为空
    pub fn take(&mut self) -> HashMap<String, CacheItem<T>> {
        std::mem::take(&mut self.items)
    }

    /// 提交失败后放回取出的项
    ///
    /// 取出之后又入队的同键新项优先保留。
    pub fn restore(&mut self, items: HashMap<String, CacheItem<T>>) {
        for (key, item) in items {
            self.items.entry(key).or_insert(item);
        }
    }
}
