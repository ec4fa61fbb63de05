//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 判断过期所用的时钟。

use chrono::{DateTime, Utc};

/// 时钟接口
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
