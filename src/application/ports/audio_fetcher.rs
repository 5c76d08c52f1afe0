//! Audio Fetcher Port - 读取临时音频字节
//!
//! 后端返回进程内 blob 引用时，上传到服务端缓存前需要先取出字节

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::AudioLocator;

/// 读取错误
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Unsupported locator: {0}")]
    Unsupported(String),

    #[error("Audio not found: {0}")]
    NotFound(String),
}

/// 读取到的音频
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Audio Fetcher Port
#[async_trait]
pub trait AudioFetcherPort: Send + Sync {
    async fn fetch(&self, locator: &AudioLocator) -> Result<FetchedAudio, FetchError>;
}
