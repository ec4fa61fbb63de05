//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存池依赖的键值存储接口及其实现。

pub mod memory;
pub mod redis_store;

use crate::error::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis_store::{DefaultRedisProvider, RedisProvider, RedisStore};

/// 批处理中的单条命令
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    Set { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// 管道批处理
///
/// 命令在客户端排队，通过 [`StoreClient::execute`] 一次性发送。
/// 只保证批量发送，不保证事务原子性。
#[derive(Debug, Default, Clone)]
pub struct StoreBatch {
    operations: Vec<BatchOperation>,
}

impl StoreBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Vec<u8>) -> &mut Self {
        self.operations.push(BatchOperation::Set {
            key: key.into(),
            value,
        });
        self
    }

    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.operations
            .push(BatchOperation::Delete { key: key.into() });
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[BatchOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<BatchOperation> {
        self.operations
    }
}

/// 键值存储客户端
///
/// 只要求单键原子操作和无序管道。连接管理和重试由实现自行负责，
/// 错误原样向上传递。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// 读取单个键
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 一次往返读取多个键，结果与 `keys` 顺序一致
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// 无条件写入
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// 删除键，键不存在时不报错
    async fn del(&self, key: &str) -> Result<()>;

    /// 仅当键不存在时写入，可同时设置存活时间（秒）
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<bool>;

    /// 为已存在的键设置存活时间（秒），键不存在时返回 `false`
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool>;

    /// 清空整个键空间，返回存储是否报告成功
    async fn flush_all(&self) -> Result<bool>;

    /// 一次性发送批处理中的所有命令
    async fn execute(&self, batch: StoreBatch) -> Result<()>;

    /// 检查连接是否正常
    async fn ping(&self) -> Result<()>;
}
