//! oxpool - 基于Redis的缓存池
//!
//! 提供带过期时间的读写删除、批量延迟写入，以及基于非阻塞分布式锁的缓存击穿保护，
//! 让多个进程共享同一份缓存而不会重复重建同一个过期条目。
//!
//! ```no_run
//! use oxpool::{CachePool, Config};
//! use chrono::Duration;
//!
//! # async fn demo() -> oxpool::error::Result<()> {
//! let mut pool: CachePool<String> = CachePool::connect(&Config::default()).await?;
//! pool.set_stampede_protection(true);
//!
//! let mut item = pool.get_item("report").await?;
//! if !item.is_hit() {
//!     item.set("expensive result".to_string())
//!         .expires_after(Duration::minutes(5));
//!     pool.save(&item).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/oxpool/0.1.0")]

pub mod clock;
pub mod codec;
pub mod config;
pub mod deferred;
pub mod error;
pub mod item;
pub mod lock;
pub mod pool;
pub mod serialization;
pub mod store;
pub mod telemetry;
pub mod utils;

// Re-export commonly used items
pub use clock::{Clock, SystemClock};
pub use config::{Config, PoolConfig, StoreConfig};
pub use error::{CacheError, Result};
pub use item::CacheItem;
pub use pool::CachePool;
pub use store::{MemoryStore, RedisStore, StoreBatch, StoreClient};

/// oxpool 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
