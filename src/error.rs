//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存池的错误类型和处理机制。

use thiserror::Error;

/// 缓存池错误类型枚举
///
/// 解码失败和锁竞争失败都不是错误：前者视为未命中，后者视为他人正在重建。
/// 这里只包含需要调用方感知的失败。
#[derive(Error, Debug)]
pub enum CacheError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// 存储后端错误（非Redis后端或后端拒绝批处理）
    #[error("Backend error: {0}")]
    BackendError(String),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML配置解析错误
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// 缓存操作结果类型别名
pub type Result<T> = std::result::Result<T, CacheError>;
