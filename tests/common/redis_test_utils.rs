//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis测试工具

#![allow(dead_code)]

use oxpool::config::{Config, PoolConfig, RedisMode, StoreConfig};
use oxpool::store::{RedisStore, StoreClient};
use secrecy::SecretString;

/// 测试默认使用 15 号库，避免清空开发数据
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string())
}

pub fn create_standalone_config() -> StoreConfig {
    StoreConfig {
        mode: RedisMode::Standalone,
        connection_string: SecretString::new(redis_url().into()),
        connection_timeout_ms: 1000,
        command_timeout_ms: 3000,
        password: None,
        enable_tls: false,
        sentinel: None,
    }
}

pub fn create_config(stampede_protection: bool) -> Config {
    Config {
        config_version: Some(1),
        pool: PoolConfig {
            stampede_protection,
            ..Default::default()
        },
        store: create_standalone_config(),
    }
}

/// 检查Redis是否可用
pub async fn is_redis_available() -> bool {
    match RedisStore::new(&create_standalone_config()).await {
        Ok(store) => store.ping().await.is_ok(),
        Err(_) => false,
    }
}
