//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了存储条目的编解码规则。
//!
//! 每个缓存键下保存一个只含两个字段的信封：`{"v": 值, "t": 过期时间}`。
//! 命中状态不落盘，读取时根据 `t` 与当前时间计算。

use crate::error::Result;
use crate::serialization::{JsonSerializer, Serializer, SerializerEnum};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::trace;

const VALUE_FIELD: &str = "v";
const EXPIRATION_FIELD: &str = "t";

/// 解码后的存储条目
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry<T> {
    /// 存储的值，`None` 表示保存时值为空
    pub value: Option<T>,
    /// 绝对过期时间，`None` 表示永不过期
    pub expiration: Option<DateTime<Utc>>,
}

impl<T> StoredEntry<T> {
    /// 条目在 `now` 时刻是否仍然有效
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            None => true,
            Some(expiration) => expiration > now,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    v: Option<&'a T>,
    t: Option<DateTime<Utc>>,
}

/// 条目编解码器
#[derive(Clone, Debug, Default)]
pub struct EntryCodec {
    serializer: SerializerEnum,
}

impl EntryCodec {
    pub fn new(serializer: SerializerEnum) -> Self {
        Self { serializer }
    }

    /// 根据是否压缩创建编解码器
    pub fn with_compression(compress: bool) -> Self {
        let json = if compress {
            JsonSerializer::with_compression()
        } else {
            JsonSerializer::new()
        };
        Self::new(SerializerEnum::Json(json))
    }

    /// 将值和过期时间打包为字节
    pub fn encode<T: Serialize>(
        &self,
        value: Option<&T>,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>> {
        self.serializer.serialize(&Envelope {
            v: value,
            t: expiration,
        })
    }

    /// 解码存储的字节
    ///
    /// 空数据、无法解析的数据以及结构不是恰好 `v`/`t` 两个字段的数据都返回 `None`，
    /// 调用方将其视为未命中，而不是错误。
    pub fn decode<T: DeserializeOwned>(&self, data: Option<&[u8]>) -> Option<StoredEntry<T>> {
        let data = data.filter(|d| !d.is_empty())?;

        let document: Value = match self.serializer.deserialize(data) {
            Ok(document) => document,
            Err(e) => {
                trace!("Discarding undecodable entry: {}", e);
                return None;
            }
        };

        let Value::Object(mut fields) = document else {
            trace!("Discarding entry: not an object");
            return None;
        };
        if fields.len() != 2 {
            trace!("Discarding entry: expected 2 fields, found {}", fields.len());
            return None;
        }

        let raw_value = fields.remove(VALUE_FIELD)?;
        let raw_expiration = fields.remove(EXPIRATION_FIELD)?;

        let expiration = match raw_expiration {
            Value::Null => None,
            other => match serde_json::from_value::<DateTime<Utc>>(other) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    trace!("Discarding entry: bad expiration: {}", e);
                    return None;
                }
            },
        };

        let value = match serde_json::from_value::<Option<T>>(raw_value) {
            Ok(value) => value,
            Err(e) => {
                trace!("Discarding entry: value has unexpected type: {}", e);
                return None;
            }
        };

        Some(StoredEntry { value, expiration })
    }
}
