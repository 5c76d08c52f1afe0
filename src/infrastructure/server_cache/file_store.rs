//! File Cache Server - 文件系统持久化缓存服务
//!
//! 在消息通道的服务端一侧应答协议消息，每个缓存 key 对应：
//! - 音频文件 `<key>.<ext>`
//! - 元数据 sidecar `<key>.meta.json`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::protocol::{decode_data_url, decode_frame, encode_frame, ClientMessage, ServerMessage};
use crate::application::ports::MessageChannel;

/// 文件缓存错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unsupported mime type: {0}")]
    UnsupportedMimeType(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::IoError(err.to_string())
    }
}

/// 文件缓存配置
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// 音频目录
    pub audio_dir: PathBuf,
    /// 单个文件最大字节数
    pub max_file_size_bytes: u64,
    /// 允许的 mime 类型
    pub allowed_mime_types: Vec<String>,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("narrator-cache"),
            max_file_size_bytes: 50 * 1024 * 1024, // 50MB
            allowed_mime_types: ["audio/mpeg", "audio/wav", "audio/ogg", "audio/mp3"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// sidecar 元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SidecarMetadata {
    cache_key: String,
    duration: f64,
    mime_type: String,
    file_size: u64,
    file_name: String,
    created_at: DateTime<Utc>,
    /// 客户端附加的元数据
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// 已保存的音频
#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub file_path: String,
    pub duration_secs: f64,
    pub size_bytes: u64,
    pub metadata: Value,
}

/// 文件缓存服务
pub struct FileCacheServer {
    config: FileStoreConfig,
}

impl FileCacheServer {
    /// 创建服务并确保目录存在
    pub async fn new(config: FileStoreConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.audio_dir).await?;

        tracing::info!(
            audio_dir = %config.audio_dir.display(),
            max_file_size_bytes = config.max_file_size_bytes,
            "FileCacheServer initialized"
        );

        Ok(Self { config })
    }

    /// 在后台任务中服务一个通道端点
    ///
    /// 上传在独立任务中落盘，查询不会排在大文件写入之后
    pub fn spawn(self: Arc<Self>, channel: Arc<dyn MessageChannel>) -> JoinHandle<()> {
        let rx = channel.subscribe();
        tokio::spawn(async move { self.serve(rx, channel).await })
    }

    async fn serve(
        self: Arc<Self>,
        mut rx: broadcast::Receiver<String>,
        channel: Arc<dyn MessageChannel>,
    ) {
        loop {
            let frame = match rx.recv().await {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "FileCacheServer lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let message: ClientMessage = match decode_frame(&frame) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring malformed client frame");
                    continue;
                }
            };

            if matches!(message, ClientMessage::UploadAudio { .. }) {
                let server = self.clone();
                let channel = channel.clone();
                tokio::spawn(async move {
                    let reply = server.handle(message).await;
                    send_reply(channel.as_ref(), &reply);
                });
            } else {
                let reply = self.handle(message).await;
                send_reply(channel.as_ref(), &reply);
            }
        }
        tracing::debug!("FileCacheServer stopped");
    }

    /// 处理一条客户端消息
    pub async fn handle(&self, message: ClientMessage) -> ServerMessage {
        match message {
            ClientMessage::CheckAvailable {} => ServerMessage::Available {},
            ClientMessage::CheckAudio { cache_key } => match self.lookup(&cache_key).await {
                Ok(Some(stored)) => ServerMessage::AudioExists {
                    cache_key,
                    file_path: stored.file_path,
                    duration: stored.duration_secs,
                    metadata: Some(stored.metadata),
                },
                Ok(None) => ServerMessage::AudioNotFound { cache_key },
                Err(e) => {
                    tracing::error!(cache_key = %cache_key, error = %e, "Audio check error");
                    ServerMessage::AudioNotFound { cache_key }
                }
            },
            ClientMessage::UploadAudio {
                data,
                mime_type,
                cache_key,
                duration,
                metadata,
            } => match self
                .store(&cache_key, &data, &mime_type, duration, metadata)
                .await
            {
                Ok(stored) => ServerMessage::UploadSuccess {
                    cache_key,
                    file_path: stored.file_path,
                    duration: stored.duration_secs,
                    size: Some(stored.size_bytes),
                },
                Err(e) => {
                    tracing::warn!(cache_key = %cache_key, error = %e, "Audio upload rejected");
                    ServerMessage::UploadError {
                        cache_key: Some(cache_key),
                        error: e.to_string(),
                    }
                }
            },
        }
    }

    /// 保存上传的音频和 sidecar
    pub async fn store(
        &self,
        cache_key: &str,
        data_url: &str,
        mime_type: &str,
        duration: f64,
        metadata: Map<String, Value>,
    ) -> Result<StoredAudio, StoreError> {
        validate_key(cache_key)?;

        if !self.config.allowed_mime_types.iter().any(|m| m == mime_type) {
            return Err(StoreError::UnsupportedMimeType(mime_type.to_string()));
        }

        let audio_data =
            decode_data_url(data_url).map_err(|e| StoreError::InvalidPayload(e.to_string()))?;
        let size = audio_data.len() as u64;
        if size > self.config.max_file_size_bytes {
            return Err(StoreError::TooLarge {
                size,
                max: self.config.max_file_size_bytes,
            });
        }

        let file_name = format!("{}.{}", cache_key, extension_for_mime(mime_type));
        let audio_path = self.config.audio_dir.join(&file_name);
        fs::write(&audio_path, &audio_data).await?;

        let sidecar = SidecarMetadata {
            cache_key: cache_key.to_string(),
            duration,
            mime_type: mime_type.to_string(),
            file_size: size,
            file_name,
            created_at: Utc::now(),
            extra: metadata,
        };
        let sidecar_json = serde_json::to_string_pretty(&sidecar)
            .map_err(|e| StoreError::InvalidPayload(e.to_string()))?;
        fs::write(self.sidecar_path(cache_key), sidecar_json).await?;

        tracing::info!(
            cache_key = %cache_key,
            path = %audio_path.display(),
            size_bytes = size,
            "Audio file cached"
        );

        Ok(StoredAudio {
            file_path: audio_path.to_string_lossy().to_string(),
            duration_secs: duration,
            size_bytes: size,
            metadata: serde_json::to_value(&sidecar)
                .map_err(|e| StoreError::InvalidPayload(e.to_string()))?,
        })
    }

    /// 查找已缓存的音频
    ///
    /// 音频文件名从 sidecar 读取，两者缺一即视为不存在
    pub async fn lookup(&self, cache_key: &str) -> Result<Option<StoredAudio>, StoreError> {
        validate_key(cache_key)?;

        let sidecar_path = self.sidecar_path(cache_key);
        if !fs::try_exists(&sidecar_path).await? {
            return Ok(None);
        }

        let raw = fs::read_to_string(&sidecar_path).await?;
        let sidecar: SidecarMetadata =
            serde_json::from_str(&raw).map_err(|e| StoreError::InvalidPayload(e.to_string()))?;

        let audio_path = self.config.audio_dir.join(&sidecar.file_name);
        if sidecar.file_name.contains(|c| c == '/' || c == '\\') || !fs::try_exists(&audio_path).await? {
            return Ok(None);
        }

        let metadata = serde_json::to_value(&sidecar)
            .map_err(|e| StoreError::InvalidPayload(e.to_string()))?;
        Ok(Some(StoredAudio {
            file_path: audio_path.to_string_lossy().to_string(),
            duration_secs: sidecar.duration,
            size_bytes: sidecar.file_size,
            metadata,
        }))
    }

    fn sidecar_path(&self, cache_key: &str) -> PathBuf {
        self.config.audio_dir.join(format!("{}.meta.json", cache_key))
    }
}

fn send_reply(channel: &dyn MessageChannel, reply: &ServerMessage) {
    match encode_frame(reply) {
        Ok(frame) => {
            if let Err(e) = channel.send(frame) {
                tracing::debug!(error = %e, "Reply not delivered");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode reply"),
    }
}

/// 缓存 key 直接用作文件名，只允许安全字符
fn validate_key(cache_key: &str) -> Result<(), StoreError> {
    let valid = !cache_key.is_empty()
        && cache_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(cache_key.to_string()))
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/webm" => "webm",
        _ => "mp3",
    }
}
