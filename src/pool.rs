//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存池：读取与过期判断、缓存击穿保护、立即写入与延迟写入。
//!
//! 多个进程通过同一个存储共享缓存。条目过期后，启用击穿保护的缓存池会先尝试获取
//! 该键的非阻塞锁：拿到锁的调用方得到未命中并负责重建，其余调用方把旧值当作命中返回，
//! 直到新值写入（同时释放锁）或锁的存活时间到期。

use crate::clock::{Clock, SystemClock};
use crate::codec::EntryCodec;
use crate::config::{Config, PoolConfig};
use crate::deferred::DeferredQueue;
use crate::error::Result;
use crate::item::CacheItem;
use crate::lock::LockManager;
use crate::store::{RedisStore, StoreBatch, StoreClient};
use crate::utils::redaction::RedactedKey;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 缓存池
///
/// 方法接收 `&mut self`：单个实例同一时刻只由一个任务驱动，
/// 并发发生在共享同一存储的多个实例之间。
pub struct CachePool<T = serde_json::Value> {
    store: Arc<dyn StoreClient>,
    codec: EntryCodec,
    locks: LockManager,
    deferred: DeferredQueue<T>,
    stampede_protection: bool,
    clock: Arc<dyn Clock>,
}

impl<T> CachePool<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// 使用默认配置创建缓存池
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self::build(store, &PoolConfig::default())
    }

    /// 按配置创建缓存池，锁前缀不能为空，锁存活时间须在1到3600秒之间
    pub fn with_config(store: Arc<dyn StoreClient>, config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<dyn StoreClient>, config: &PoolConfig) -> Self {
        Self {
            locks: LockManager::new(
                store.clone(),
                config.lock_prefix.clone(),
                config.lock_ttl_secs,
            ),
            codec: EntryCodec::with_compression(config.compression),
            deferred: DeferredQueue::new(),
            stampede_protection: config.stampede_protection,
            clock: Arc::new(SystemClock),
            store,
        }
    }

    /// 按配置连接Redis并创建缓存池
    ///
    /// 连接在构造时建立，缓存池释放时随之关闭。
    #[instrument(skip(config), level = "info", name = "connect_cache_pool")]
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = RedisStore::new(&config.store).await?;
        info!(
            "Cache pool connected, stampede_protection={}",
            config.pool.stampede_protection
        );
        Self::with_config(Arc::new(store), &config.pool)
    }

    /// 替换判断过期所用的时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn set_stampede_protection(&mut self, enabled: bool) {
        self.stampede_protection = enabled;
    }

    pub fn stampede_protection(&self) -> bool {
        self.stampede_protection
    }

    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    /// 读取单个缓存项
    ///
    /// 数据缺失或无法解码时返回未命中。条目过期且启用了击穿保护时尝试加锁：
    /// 加锁成功则保持未命中，由调用方重建并保存；加锁失败说明他人正在重建，
    /// 旧值按命中返回。从未写入过的键不加锁。
    #[instrument(skip(self, key), level = "debug", fields(key = %RedactedKey(key)))]
    pub async fn get_item(&mut self, key: &str) -> Result<CacheItem<T>> {
        let raw = self.store.get(key).await?;
        self.build_item(key, raw.as_deref()).await
    }

    /// 读取多个缓存项
    ///
    /// 原始数据一次往返读取，过期判断和加锁逐键进行。重复的键只返回一项。
    #[instrument(skip(self, keys), level = "debug")]
    pub async fn get_items<I, K>(&mut self, keys: I) -> Result<HashMap<String, CacheItem<T>>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut distinct: Vec<String> = Vec::new();
        for key in keys {
            let key = key.as_ref();
            if !distinct.iter().any(|k| k == key) {
                distinct.push(key.to_string());
            }
        }

        let raws = self.store.get_many(&distinct).await?;
        let mut items = HashMap::with_capacity(distinct.len());
        for (key, raw) in distinct.into_iter().zip(raws) {
            let item = self.build_item(&key, raw.as_deref()).await?;
            items.insert(key, item);
        }
        Ok(items)
    }

    /// 键下是否有未过期的条目，不会加锁
    #[instrument(skip(self, key), level = "debug", fields(key = %RedactedKey(key)))]
    pub async fn has_item(&self, key: &str) -> Result<bool> {
        let raw = self.store.get(key).await?;
        Ok(self
            .codec
            .decode::<T>(raw.as_deref())
            .is_some_and(|entry| entry.is_fresh(self.clock.now())))
    }

    async fn build_item(&mut self, key: &str, raw: Option<&[u8]>) -> Result<CacheItem<T>> {
        let Some(entry) = self.codec.decode::<T>(raw) else {
            debug!("Cache miss");
            return Ok(CacheItem::miss(key));
        };

        let mut hit = entry.is_fresh(self.clock.now());
        if !hit && self.stampede_protection {
            if self.locks.lock(key).await? {
                debug!("Entry expired, lock acquired; caller recomputes");
            } else {
                debug!("Entry expired, lock held elsewhere; serving stale value");
                hit = true;
            }
        }

        Ok(CacheItem::new(
            key.to_string(),
            entry.value,
            entry.expiration,
            hit,
        ))
    }

    /// 立即保存缓存项，并释放本实例对该键持有的锁
    pub async fn save(&mut self, item: &CacheItem<T>) -> Result<()> {
        self.write(std::iter::once(item)).await
    }

    /// 延迟保存，提交前不访问存储
    pub fn save_deferred(&mut self, item: CacheItem<T>) {
        if self.deferred.insert(item).is_some() {
            debug!("Deferred item replaced a pending one");
        }
    }

    /// 以一个批处理写入所有延迟项
    ///
    /// 写入成功后才清空队列；失败时队列保持原样，可以重试。
    #[instrument(skip(self), level = "debug", fields(pending = self.deferred.len()))]
    pub async fn commit(&mut self) -> Result<()> {
        if self.deferred.is_empty() {
            return Ok(());
        }

        let pending = self.deferred.take();
        match self.write(pending.values()).await {
            Ok(()) => {
                debug!("Committed {} deferred items", pending.len());
                Ok(())
            }
            Err(e) => {
                warn!("Deferred commit failed, keeping {} items: {}", pending.len(), e);
                self.deferred.restore(pending);
                Err(e)
            }
        }
    }

    /// 待提交的延迟项数量
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// 本实例认为自己持有的锁数量
    pub fn held_lock_count(&self) -> usize {
        self.locks.held_count()
    }

    /// 延长本实例持有的锁，重建耗时超过锁存活时间时使用
    pub async fn extend_lock(&mut self, key: &str) -> Result<bool> {
        self.locks.extend(key).await
    }

    pub async fn delete_item(&mut self, key: &str) -> Result<()> {
        self.delete_items([key]).await
    }

    /// 以一个批处理删除条目，同时释放持有的锁并丢弃同键的延迟项
    #[instrument(skip(self, keys), level = "debug")]
    pub async fn delete_items<I, K>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        if keys.is_empty() {
            return Ok(());
        }

        let mut batch = StoreBatch::new();
        for key in &keys {
            batch.del(key.as_str());
            self.locks.release_into(&mut batch, key);
        }
        self.store.execute(batch).await?;

        self.locks.settle(keys.iter().map(String::as_str));
        for key in &keys {
            self.deferred.remove(key);
        }
        debug!("Deleted {} keys", keys.len());
        Ok(())
    }

    /// 清空存储的整个键空间，不可恢复，主要用于测试准备
    ///
    /// 存储报告失败时返回 `Ok(false)`。
    #[instrument(skip(self), level = "info")]
    pub async fn clear(&mut self) -> Result<bool> {
        let flushed = self.store.flush_all().await?;
        if flushed {
            self.locks.forget_all();
        } else {
            warn!("Store reported failure while clearing");
        }
        Ok(flushed)
    }

    /// 以一个管道批处理写入缓存项，并释放对应的锁
    async fn write<'a, I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a CacheItem<T>>,
        T: 'a,
    {
        let mut batch = StoreBatch::new();
        let mut released = Vec::new();
        for item in items {
            let bytes = self.codec.encode(item.raw_value(), item.expiration())?;
            batch.set(item.key(), bytes);
            if self.locks.release_into(&mut batch, item.key()) {
                released.push(item.key().to_string());
            }
        }
        if batch.is_empty() {
            return Ok(());
        }

        let command_count = batch.len();
        self.store.execute(batch).await?;
        self.locks.settle(released.iter().map(String::as_str));
        debug!(
            "Batch written: {} commands, {} locks released",
            command_count,
            released.len()
        );
        Ok(())
    }
}

impl<T> Drop for CachePool<T> {
    fn drop(&mut self) {
        if !self.deferred.is_empty() {
            warn!(
                "Cache pool dropped with {} uncommitted deferred items",
                self.deferred.len()
            );
        }
    }
}
