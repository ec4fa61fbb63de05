//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存击穿保护使用的非阻塞分布式锁。
//!
//! 锁记录是存储中的伴随键 `前缀 + 缓存键`，带有较短的存活时间。
//! 进程崩溃而未释放的锁会在存活时间到期后自动消失。
//! 本地持有集合只用于判断是否需要释放，存储中的存活时间才是权威。

use crate::error::Result;
use crate::store::{StoreBatch, StoreClient};
use crate::utils::redaction::RedactedKey;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 锁记录的哨兵值
const LOCK_SENTINEL: &str = "1";

/// 锁管理器
///
/// 每个缓存池独占一个实例，持有集合不跨实例共享。
pub struct LockManager {
    store: Arc<dyn StoreClient>,
    prefix: String,
    ttl_secs: u64,
    held: HashSet<String>,
}

impl LockManager {
    pub fn new(store: Arc<dyn StoreClient>, prefix: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ttl_secs,
            held: HashSet::new(),
        }
    }

    /// 缓存键对应的锁键
    pub fn lock_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// 尝试获取锁
    ///
    /// 非阻塞：锁已被他人持有时立即返回 `false`，不等待也不重试。
    #[instrument(skip(self, key), level = "debug", fields(key = %RedactedKey(key)))]
    pub async fn lock(&mut self, key: &str) -> Result<bool> {
        let acquired = self
            .store
            .set_if_absent(&self.lock_key(key), LOCK_SENTINEL, Some(self.ttl_secs))
            .await?;
        if acquired {
            self.held.insert(key.to_string());
        }
        debug!("Lock attempt: acquired={}", acquired);
        Ok(acquired)
    }

    /// 单独释放锁
    ///
    /// 未持有时什么也不做。返回是否发出了删除命令。
    #[instrument(skip(self, key), level = "debug", fields(key = %RedactedKey(key)))]
    pub async fn unlock(&mut self, key: &str) -> Result<bool> {
        if !self.held.contains(key) {
            return Ok(false);
        }
        self.store.del(&self.lock_key(key)).await?;
        self.held.remove(key);
        Ok(true)
    }

    /// 在进行中的批处理里追加释放命令
    ///
    /// 本地记录保留到批处理成功后由 [`settle`](Self::settle) 清除。
    /// 返回是否追加了命令。
    pub fn release_into(&self, batch: &mut StoreBatch, key: &str) -> bool {
        if !self.held.contains(key) {
            return false;
        }
        batch.del(self.lock_key(key));
        true
    }

    /// 批处理执行成功后清除本地记录
    pub fn settle<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            self.held.remove(key);
        }
    }

    /// 重新设置锁的存活时间，重建耗时较长时使用
    ///
    /// 未持有锁，或锁已在存储中过期时返回 `false`。
    #[instrument(skip(self, key), level = "debug", fields(key = %RedactedKey(key)))]
    pub async fn extend(&mut self, key: &str) -> Result<bool> {
        if !self.held.contains(key) {
            return Ok(false);
        }
        let extended = self.store.expire(&self.lock_key(key), self.ttl_secs).await?;
        if !extended {
            // 锁已过期，可能已被他人重新获取
            self.held.remove(key);
        }
        Ok(extended)
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// 存储被清空后丢弃所有本地记录
    pub fn forget_all(&mut self) {
        self.held.clear();
    }
}
