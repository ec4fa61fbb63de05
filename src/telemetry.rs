//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志初始化辅助函数。

use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 设置了 `RUST_LOG` 时以环境变量为准，否则使用 `default_filter`（例如 `"oxpool=debug"`）。
/// 全局 subscriber 只能设置一次，重复调用会被忽略并返回 `false`，
/// 因此应用层已有日志配置时不会冲突。
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
