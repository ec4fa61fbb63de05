//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存项。

use chrono::{DateTime, Duration, Utc};

/// 缓存项
///
/// 由 [`CachePool::get_item`](crate::pool::CachePool::get_item) 在每次读取时构造，
/// 是读取时刻的快照。调用方可以修改值和过期时间后交还缓存池保存，
/// 缓存池会重新序列化，缓存项本身从不直接落盘。
#[derive(Debug, Clone, PartialEq)]
pub struct CacheItem<T> {
    key: String,
    value: Option<T>,
    expiration: Option<DateTime<Utc>>,
    hit: bool,
}

impl<T> CacheItem<T> {
    pub(crate) fn new(
        key: String,
        value: Option<T>,
        expiration: Option<DateTime<Utc>>,
        hit: bool,
    ) -> Self {
        Self {
            key,
            value,
            expiration,
            hit,
        }
    }

    /// 未命中的缓存项
    pub fn miss(key: impl Into<String>) -> Self {
        Self::new(key.into(), None, None, false)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 命中时返回值，未命中时返回 `None`
    pub fn get(&self) -> Option<&T> {
        if self.hit {
            self.value.as_ref()
        } else {
            None
        }
    }

    /// 不论是否命中都返回持有的值，写入路径使用
    pub fn raw_value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// 命中时取出值
    pub fn into_value(self) -> Option<T> {
        if self.hit {
            self.value
        } else {
            None
        }
    }

    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// 设置新值，命中状态仍描述读取时的情况
    pub fn set(&mut self, value: T) -> &mut Self {
        self.value = Some(value);
        self
    }

    /// 设置绝对过期时间，`None` 表示永不过期
    pub fn expires_at(&mut self, expiration: Option<DateTime<Utc>>) -> &mut Self {
        self.expiration = expiration;
        self
    }

    /// 设置相对当前时间的过期时间，负值表示已经过期
    pub fn expires_after(&mut self, ttl: Duration) -> &mut Self {
        self.expiration = Some(Utc::now() + ttl);
        self
    }
}
