//! Server Cache Client - 二级缓存客户端
//!
//! 通过单一消息通道访问进程外缓存服务：
//! - 首次使用时探测一次可用性，结果在客户端生命周期内保持不变
//! - check 有超时，超时视为未命中
//! - upload 发送即返回，服务端确认交给 UploadReporter

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, OnceCell};
use tokio::task::JoinHandle;

use super::correlator::Correlator;
use super::protocol::{decode_frame, encode_frame, to_data_url, ClientMessage, ServerMessage};
use crate::application::ports::{
    AudioUpload, MessageChannel, ServerCacheError, ServerCachePort, UploadReporter,
};
use crate::domain::{AudioLocator, CacheKey, CachedAudio};
use crate::infrastructure::events::TracingUploadReporter;

/// 可用性探测在关联表中使用的 key
const AVAILABILITY_KEY: &str = "narrator:available";

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ServerCacheClientConfig {
    /// 可用性探测超时
    pub availability_timeout: Duration,
    /// 单次查询超时
    pub check_timeout: Duration,
}

impl Default for ServerCacheClientConfig {
    fn default() -> Self {
        Self {
            availability_timeout: Duration::from_millis(500),
            check_timeout: Duration::from_millis(1000),
        }
    }
}

/// 监听任务与客户端共享的状态
struct ClientShared {
    availability: Correlator<()>,
    checks: Correlator<Option<CachedAudio>>,
    reporter: Arc<dyn UploadReporter>,
}

impl ClientShared {
    fn dispatch(&self, frame: &str) {
        let message: ServerMessage = match decode_frame(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed server cache frame");
                return;
            }
        };

        match message {
            ServerMessage::Available {} => {
                self.availability.complete(AVAILABILITY_KEY, ());
            }
            ServerMessage::AudioExists {
                cache_key,
                file_path,
                duration,
                ..
            } => {
                let found = if file_path.is_empty() || !duration.is_finite() || duration < 0.0 {
                    tracing::warn!(
                        cache_key = %cache_key,
                        duration = duration,
                        "Server reported unusable audio, treating as miss"
                    );
                    None
                } else {
                    tracing::debug!(
                        cache_key = %cache_key,
                        file_path = %file_path,
                        "Found existing server audio"
                    );
                    Some(CachedAudio::new(AudioLocator::new(file_path), duration))
                };
                self.checks.complete(&cache_key, found);
            }
            ServerMessage::AudioNotFound { cache_key } => {
                tracing::debug!(cache_key = %cache_key, "Audio not found on server");
                self.checks.complete(&cache_key, None);
            }
            ServerMessage::UploadSuccess {
                cache_key,
                file_path,
                duration,
                ..
            } => {
                let cache_key = CacheKey::new(cache_key);
                if file_path.is_empty() || !duration.is_finite() || duration < 0.0 {
                    tracing::warn!(cache_key = %cache_key, "Ignoring unusable upload confirmation");
                    return;
                }
                self.reporter.upload_confirmed(
                    &cache_key,
                    &CachedAudio::new(AudioLocator::new(file_path), duration),
                );
            }
            ServerMessage::UploadError { cache_key, error } => {
                self.reporter.upload_failed(
                    &CacheKey::new(cache_key.unwrap_or_default()),
                    &ServerCacheError::Rejected(error),
                );
            }
        }
    }
}

/// 二级缓存客户端
pub struct ServerCacheClient {
    channel: Option<Arc<dyn MessageChannel>>,
    config: ServerCacheClientConfig,
    available: OnceCell<bool>,
    shared: Arc<ClientShared>,
    listener: Option<JoinHandle<()>>,
}

impl ServerCacheClient {
    /// 连接到消息通道并启动监听任务
    ///
    /// 需要在 tokio 运行时内调用
    pub fn connect(
        channel: Arc<dyn MessageChannel>,
        config: ServerCacheClientConfig,
        reporter: Arc<dyn UploadReporter>,
    ) -> Self {
        let shared = Arc::new(ClientShared {
            availability: Correlator::new(),
            checks: Correlator::new(),
            reporter,
        });

        // 先订阅再发送，避免错过应答
        let rx = channel.subscribe();
        let listener = tokio::spawn(listen(rx, shared.clone()));

        Self {
            channel: Some(channel),
            config,
            available: OnceCell::new(),
            shared,
            listener: Some(listener),
        }
    }

    /// 没有消息通道：所有操作都走未命中 / 跳过上传路径
    pub fn disconnected() -> Self {
        Self {
            channel: None,
            config: ServerCacheClientConfig::default(),
            available: OnceCell::new(),
            shared: Arc::new(ClientShared {
                availability: Correlator::new(),
                checks: Correlator::new(),
                reporter: Arc::new(TracingUploadReporter),
            }),
            listener: None,
        }
    }

    fn send_message(
        channel: &dyn MessageChannel,
        message: &ClientMessage,
    ) -> Result<(), ServerCacheError> {
        let frame = encode_frame(message).map_err(|e| ServerCacheError::Encode(e.to_string()))?;
        channel
            .send(frame)
            .map_err(|e| ServerCacheError::Transport(e.to_string()))
    }

    async fn check_availability(&self, channel: &dyn MessageChannel) -> bool {
        tracing::info!("Checking server cache availability...");

        let pending = self.shared.availability.register(AVAILABILITY_KEY);
        if let Err(e) = Self::send_message(channel, &ClientMessage::CheckAvailable {}) {
            self.shared.availability.cancel(pending);
            tracing::info!(error = %e, "Server cache not available");
            return false;
        }

        let available = self
            .shared
            .availability
            .wait(pending, self.config.availability_timeout)
            .await
            .is_some();

        if available {
            tracing::info!("Server cache is available");
        } else {
            tracing::info!(
                timeout_ms = self.config.availability_timeout.as_millis() as u64,
                "Server cache not available (timeout)"
            );
        }
        available
    }
}

impl Drop for ServerCacheClient {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

async fn listen(mut rx: broadcast::Receiver<String>, shared: Arc<ClientShared>) {
    loop {
        match rx.recv().await {
            Ok(frame) => shared.dispatch(&frame),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped = skipped, "Server cache listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("Server cache channel closed");
                break;
            }
        }
    }
}

#[async_trait]
impl ServerCachePort for ServerCacheClient {
    async fn is_available(&self) -> bool {
        let Some(channel) = self.channel.as_deref() else {
            return false;
        };
        *self.available.get_or_init(|| self.check_availability(channel)).await
    }

    async fn check(&self, cache_key: &CacheKey) -> Option<CachedAudio> {
        if !self.is_available().await {
            return None;
        }
        let channel = self.channel.as_deref()?;

        let pending = self.shared.checks.register(cache_key.as_str());
        let message = ClientMessage::CheckAudio {
            cache_key: cache_key.to_string(),
        };
        if let Err(e) = Self::send_message(channel, &message) {
            self.shared.checks.cancel(pending);
            tracing::warn!(cache_key = %cache_key, error = %e, "Server cache check not sent");
            return None;
        }

        match self.shared.checks.wait(pending, self.config.check_timeout).await {
            Some(found) => found,
            None => {
                tracing::debug!(cache_key = %cache_key, "Server cache check timed out");
                None
            }
        }
    }

    async fn upload(&self, upload: AudioUpload) -> Result<(), ServerCacheError> {
        if !self.is_available().await {
            tracing::debug!(cache_key = %upload.cache_key, "Server cache not available, skipping upload");
            return Ok(());
        }
        let Some(channel) = self.channel.as_deref() else {
            return Ok(());
        };

        let size_bytes = upload.audio_data.len();
        let message = ClientMessage::UploadAudio {
            data: to_data_url(&upload.mime_type, &upload.audio_data),
            mime_type: upload.mime_type,
            cache_key: upload.cache_key.to_string(),
            duration: upload.duration_secs,
            metadata: upload.metadata,
        };
        Self::send_message(channel, &message)?;

        self.shared.reporter.upload_sent(&upload.cache_key, size_bytes);
        Ok(())
    }
}
