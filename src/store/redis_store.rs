//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的存储客户端，以及建立连接的提供者接口。

use super::{BatchOperation, StoreBatch, StoreClient};
use crate::config::{RedisMode, StoreConfig};
use crate::error::{CacheError, Result};
use crate::utils::redaction::{redact_connection_string, RedactedKey};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, RedisResult};
use secrecy::ExposeSecret;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, instrument};

/// Redis连接提供者
///
/// 把建立连接和使用连接分开，测试可以替换连接方式
#[async_trait]
pub trait RedisProvider: Send + Sync {
    async fn get_standalone_client(&self, config: &StoreConfig)
        -> Result<(Client, ConnectionManager)>;
    async fn get_sentinel_client(&self, config: &StoreConfig)
        -> Result<(Client, ConnectionManager)>;
}

pub struct DefaultRedisProvider;

impl DefaultRedisProvider {
    async fn connect(
        client: &Client,
        connection_timeout_ms: u64,
        target: &str,
    ) -> Result<ConnectionManager> {
        match timeout(
            Duration::from_millis(connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        {
            Ok(res) => Ok(res?),
            Err(_) => Err(CacheError::Timeout(format!(
                "Connection timed out after {}ms. Target: {}",
                connection_timeout_ms, target
            ))),
        }
    }
}

#[async_trait]
impl RedisProvider for DefaultRedisProvider {
    async fn get_standalone_client(
        &self,
        config: &StoreConfig,
    ) -> Result<(Client, ConnectionManager)> {
        let raw = config.connection_string.expose_secret();
        let connection_string = if config.enable_tls && !raw.starts_with("rediss://") {
            raw.replace("redis://", "rediss://")
        } else {
            raw.to_string()
        };
        let redacted = redact_connection_string(&connection_string);

        info!("Connecting to Redis at {}", redacted);
        let client = Client::open(connection_string.as_str())?;
        let manager = Self::connect(&client, config.connection_timeout_ms, &redacted).await?;
        Ok((client, manager))
    }

    async fn get_sentinel_client(
        &self,
        config: &StoreConfig,
    ) -> Result<(Client, ConnectionManager)> {
        let sentinel_config = config.sentinel.as_ref().ok_or_else(|| {
            CacheError::Configuration("Sentinel configuration is missing".to_string())
        })?;

        // redis+sentinel://[:password@]host:port[,host:port]/service_name
        let mut url = "redis+sentinel://".to_string();
        if let Some(password) = &config.password {
            url.push_str(&format!(":{}@", password.expose_secret()));
        }

        let nodes: Vec<&str> = sentinel_config
            .nodes
            .iter()
            .map(|n| {
                n.trim_start_matches("redis://")
                    .trim_start_matches("redis+sentinel://")
            })
            .collect();
        if nodes.is_empty() {
            return Err(CacheError::Configuration(
                "No sentinel nodes provided".to_string(),
            ));
        }

        url.push_str(&nodes.join(","));
        url.push('/');
        url.push_str(&sentinel_config.master_name);

        let redacted = redact_connection_string(&url);
        info!("Connecting to Redis via Sentinel at {}", redacted);
        let client = Client::open(url)?;
        let manager = Self::connect(&client, config.connection_timeout_ms, &redacted).await?;
        Ok((client, manager))
    }
}

/// Redis存储客户端
///
/// 构造时建立连接，`ConnectionManager` 负责断线重连；
/// 最后一个持有者被释放时连接随之关闭。
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    command_timeout_ms: u64,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("command_timeout_ms", &self.command_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// 根据配置建立连接
    #[instrument(skip(config), level = "info", name = "init_redis_store")]
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        Self::new_with_provider(config, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的Redis提供者建立连接
    #[instrument(skip(config, provider), level = "info", fields(mode = ?config.mode))]
    pub async fn new_with_provider(
        config: &StoreConfig,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let (_client, manager) = match config.mode {
            RedisMode::Standalone => provider.get_standalone_client(config).await?,
            RedisMode::Sentinel => provider.get_sentinel_client(config).await?,
        };
        Ok(Self {
            manager,
            command_timeout_ms: config.command_timeout_ms,
        })
    }

    async fn run<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(Duration::from_millis(self.command_timeout_ms), fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(CacheError::Timeout(format!(
                "{} timed out after {}ms",
                op, self.command_timeout_ms
            ))),
        }
    }
}

#[async_trait]
impl StoreClient for RedisStore {
    #[instrument(skip(self, key), level = "debug", fields(key = %RedactedKey(key)))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let cmd = {
            let mut cmd = redis::cmd("GET");
            cmd.arg(key);
            cmd
        };
        self.run("GET", cmd.query_async::<Option<Vec<u8>>>(&mut conn))
            .await
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();
        let cmd = {
            let mut cmd = redis::cmd("MGET");
            for key in keys {
                cmd.arg(key);
            }
            cmd
        };
        self.run("MGET", cmd.query_async::<Vec<Option<Vec<u8>>>>(&mut conn))
            .await
    }

    #[instrument(skip(self, key, value), level = "debug", fields(key = %RedactedKey(key), value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.manager.clone();
        let cmd = {
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value);
            cmd
        };
        self.run("SET", cmd.query_async::<()>(&mut conn)).await
    }

    #[instrument(skip(self, key), level = "debug", fields(key = %RedactedKey(key)))]
    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let cmd = {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(key);
            cmd
        };
        self.run("DEL", cmd.query_async::<()>(&mut conn)).await
    }

    /// 使用 SET NX EX，写入与设置存活时间在同一条命令内完成
    #[instrument(skip(self, key, value), level = "debug", fields(key = %RedactedKey(key)))]
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<bool> {
        let mut conn = self.manager.clone();
        let cmd = {
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value).arg("NX");
            if let Some(ttl) = ttl_secs {
                cmd.arg("EX").arg(ttl);
            }
            cmd
        };
        let result: Option<String> = self
            .run("SET NX", cmd.query_async::<Option<String>>(&mut conn))
            .await?;
        debug!("SET NX result: success={}", result.is_some());
        Ok(result.is_some())
    }

    #[instrument(skip(self, key), level = "debug", fields(key = %RedactedKey(key)))]
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let mut conn = self.manager.clone();
        let cmd = {
            let mut cmd = redis::cmd("EXPIRE");
            cmd.arg(key).arg(ttl_secs);
            cmd
        };
        self.run("EXPIRE", cmd.query_async::<bool>(&mut conn)).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn flush_all(&self) -> Result<bool> {
        let mut conn = self.manager.clone();
        let reply: String = self
            .run("FLUSHDB", redis::cmd("FLUSHDB").query_async::<String>(&mut conn))
            .await?;
        Ok(reply == "OK")
    }

    #[instrument(skip(self, batch), level = "debug", fields(command_count = batch.len()))]
    async fn execute(&self, batch: StoreBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for operation in batch.into_operations() {
            match operation {
                BatchOperation::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                BatchOperation::Delete { key } => {
                    pipe.del(key).ignore();
                }
            }
        }

        let mut conn = self.manager.clone();
        self.run("PIPELINE", pipe.query_async::<()>(&mut conn)).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let response: String = self
            .run("PING", redis::cmd("PING").query_async::<String>(&mut conn))
            .await?;
        debug!("Redis PING response: {}", response);
        Ok(())
    }
}
