//! Server Cache Port - 二级（进程外）持久化缓存
//!
//! 服务端可能不存在；不存在或不健康时只影响命中率，不影响正确性

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{CacheKey, CachedAudio};

/// Server Cache 错误
///
/// 只会出现在后台上传路径上，从不传播给旁白调用方
#[derive(Debug, Clone, Error)]
pub enum ServerCacheError {
    #[error("Failed to fetch audio bytes: {0}")]
    Fetch(String),

    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server rejected upload: {0}")]
    Rejected(String),
}

/// 上传请求
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub cache_key: CacheKey,
    pub audio_data: Vec<u8>,
    pub mime_type: String,
    pub duration_secs: f64,
    /// 附加元数据（如 generatedAt），原样写入服务端 sidecar
    pub metadata: Map<String, Value>,
}

/// Server Cache Port
#[async_trait]
pub trait ServerCachePort: Send + Sync {
    /// 服务端是否可用（进程内只探测一次）
    async fn is_available(&self) -> bool;

    /// 查询缓存
    ///
    /// 超时、服务端不可用、应答异常都视为未命中
    async fn check(&self, cache_key: &CacheKey) -> Option<CachedAudio>;

    /// 上传音频（发送即返回，不等待服务端确认）
    ///
    /// 服务端不可用时静默跳过
    async fn upload(&self, upload: AudioUpload) -> Result<(), ServerCacheError>;
}
