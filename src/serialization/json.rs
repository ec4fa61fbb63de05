//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON序列化器的实现。

use super::Serializer;
use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::borrow::Cow;

/// JSON序列化器
///
/// 实现基于serde_json的序列化和反序列化，可选gzip压缩
#[derive(Clone, Debug)]
pub struct JsonSerializer {
    /// 是否启用压缩
    compress: bool,
}

impl JsonSerializer {
    /// 创建新的JSON序列化器
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// 创建启用压缩的JSON序列化器
    pub fn with_compression() -> Self {
        Self { compress: true }
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let json_bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;

        if !self.compress {
            return Ok(json_bytes);
        }

        #[cfg(feature = "flate2")]
        {
            use flate2::write::GzEncoder;
            use flate2::Compression;
            use std::io::Write;

            let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
            encoder
                .write_all(&json_bytes)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CacheError::Serialization(e.to_string()))
        }

        #[cfg(not(feature = "flate2"))]
        {
            // 未启用flate2特性时退化为不压缩
            Ok(json_bytes)
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        let json_bytes: Cow<'_, [u8]> = if self.compress {
            #[cfg(feature = "flate2")]
            {
                use flate2::read::GzDecoder;
                use std::io::Read;

                let mut decoder = GzDecoder::new(data);
                let mut decoded = Vec::new();
                decoder
                    .read_to_end(&mut decoded)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Cow::Owned(decoded)
            }

            #[cfg(not(feature = "flate2"))]
            {
                Cow::Borrowed(data)
            }
        } else {
            Cow::Borrowed(data)
        };

        serde_json::from_slice(&json_bytes).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}
