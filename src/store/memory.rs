//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内存储，语义与Redis的单键命令一致。
//!
//! 克隆出的实例共享同一份数据，可以让多个缓存池模拟多个进程共用一个存储。

use super::{BatchOperation, StoreBatch, StoreClient};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// 进程内存储
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前未过期的键数量
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 键的剩余存活时间，没有设置存活时间或键不存在时返回 `None`
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        entry.expires_at.map(|at| at.saturating_duration_since(now))
    }

    fn apply(&self, operation: BatchOperation) {
        match operation {
            BatchOperation::Set { key, value } => {
                // SET 会清除已有的存活时间
                self.entries.insert(
                    key,
                    MemoryEntry {
                        value,
                        expires_at: None,
                    },
                );
            }
            BatchOperation::Delete { key } => {
                self.entries.remove(&key);
            }
        }
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }
        // 读锁已释放，惰性清理过期键
        self.entries.remove_if(key, |_, e| e.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.apply(BatchOperation::Set {
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<bool> {
        let now = Instant::now();
        let fresh = MemoryEntry {
            value: value.as_bytes().to_vec(),
            expires_at: ttl_secs.map(|ttl| now + Duration::from_secs(ttl)),
        };

        // entry() 持有分片写锁，检查与写入之间不会被其他调用插入
        let acquired = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(fresh);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                true
            }
        };
        Ok(acquired)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + Duration::from_secs(ttl_secs));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn flush_all(&self) -> Result<bool> {
        self.entries.clear();
        Ok(true)
    }

    #[instrument(skip(self, batch), level = "debug", fields(command_count = batch.len()))]
    async fn execute(&self, batch: StoreBatch) -> Result<()> {
        for operation in batch.into_operations() {
            self.apply(operation);
        }
        debug!("Memory store batch applied");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
