//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存池的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

/// 锁键默认前缀，与普通缓存键命名空间隔离
pub const DEFAULT_LOCK_PREFIX: &str = "*lock*";

/// 锁的默认存活时间（秒）
pub const DEFAULT_LOCK_TTL_SECS: u64 = 10;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// 缓存池配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct PoolConfig {
    /// 是否启用缓存击穿保护
    pub stampede_protection: bool,
    /// 锁的存活时间（秒）
    pub lock_ttl_secs: u64,
    /// 锁键前缀
    pub lock_prefix: String,
    /// 是否对存储条目启用gzip压缩
    pub compression: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            stampede_protection: false,
            lock_ttl_secs: DEFAULT_LOCK_TTL_SECS,
            lock_prefix: DEFAULT_LOCK_PREFIX.to_string(),
            compression: false,
        }
    }
}

/// Redis模式
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// 单机模式
    #[default]
    Standalone,
    /// 哨兵模式
    Sentinel,
}

/// 存储（Redis）配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis模式
    pub mode: RedisMode,
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// Redis 密码（可选）
    pub password: Option<SecretString>,
    /// 是否启用 TLS
    pub enable_tls: bool,
    /// 哨兵配置
    pub sentinel: Option<SentinelConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mode: RedisMode::Standalone,
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            password: None,
            enable_tls: false,
            sentinel: None,
        }
    }
}

/// 哨兵配置
#[derive(Deserialize, Clone, Debug)]
pub struct SentinelConfig {
    /// 主节点名称
    pub master_name: String,
    /// 哨兵节点列表
    pub nodes: Vec<String>,
}

impl Config {
    /// 从TOML字符串解析配置并验证
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从TOML文件加载配置并验证
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有必需的字段都已设置，并且值在合理范围内
    pub fn validate(&self) -> Result<()> {
        if let Some(version) = self.config_version {
            if version > CONFIG_VERSION {
                return Err(CacheError::Configuration(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                )));
            }
        }

        self.pool.validate()?;
        self.store.validate()
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lock_ttl_secs == 0 || self.lock_ttl_secs > 3600 {
            return Err(CacheError::Configuration(
                "lock_ttl_secs must be between 1 and 3600 seconds".to_string(),
            ));
        }
        if self.lock_prefix.is_empty() {
            return Err(CacheError::Configuration(
                "lock_prefix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connection_timeout_ms == 0 {
            return Err(CacheError::Configuration(
                "connection_timeout_ms cannot be zero".to_string(),
            ));
        }
        if self.command_timeout_ms == 0 {
            return Err(CacheError::Configuration(
                "command_timeout_ms cannot be zero".to_string(),
            ));
        }

        match self.mode {
            RedisMode::Standalone => {
                if self.connection_string.expose_secret().is_empty() {
                    return Err(CacheError::Configuration(
                        "connection_string cannot be empty in standalone mode".to_string(),
                    ));
                }
            }
            RedisMode::Sentinel => {
                let sentinel = self.sentinel.as_ref().ok_or_else(|| {
                    CacheError::Configuration(
                        "Sentinel mode requires a [store.sentinel] section".to_string(),
                    )
                })?;
                if sentinel.nodes.is_empty() {
                    return Err(CacheError::Configuration(
                        "No sentinel nodes provided".to_string(),
                    ));
                }
                if sentinel.master_name.is_empty() {
                    return Err(CacheError::Configuration(
                        "Sentinel master_name cannot be empty".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
