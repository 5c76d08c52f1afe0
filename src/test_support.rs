//! 测试辅助：计数后端、记录型 UploadReporter、脚本化缓存服务端

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::error::NarrationError;
use crate::application::ports::{MessageChannel, NarrationProvider, ServerCacheError, UploadReporter};
use crate::domain::{
    generate_cache_key, AudioLocator, CacheKey, CachedAudio, Narration, NarrationRequest,
};
use crate::infrastructure::memory::BlobStore;
use crate::infrastructure::server_cache::protocol::{
    decode_frame, encode_frame, ClientMessage, ServerMessage,
};
use crate::infrastructure::transport::InProcessChannel;

/// 计数后端返回的音频类型
pub enum AudioKind {
    None,
    Transient(Arc<BlobStore>),
    Durable,
}

/// 记录调用次数的后端，可配置延迟和前 N 次失败
pub struct CountingProvider {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    latency: Duration,
    audio: AudioKind,
}

impl CountingProvider {
    pub fn new(audio: AudioKind) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            latency: Duration::ZERO,
            audio,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrationProvider for CountingProvider {
    fn name(&self) -> &str {
        "Counting Provider"
    }

    fn generate_key(&self, request: &NarrationRequest) -> CacheKey {
        generate_cache_key(
            request.text(),
            &["counting", request.option("voice").unwrap_or("default")],
        )
    }

    async fn resolve(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(NarrationError::provider(self.name(), "synthetic failure"));
        }

        let locator = match &self.audio {
            AudioKind::None => AudioLocator::empty(),
            AudioKind::Transient(blobs) => {
                blobs.insert(format!("audio:{}", request.text()).into_bytes(), "audio/mpeg")
            }
            AudioKind::Durable => AudioLocator::new(format!("/audio/{}.mp3", request.text())),
        };

        Ok(Narration::new(
            self.generate_key(request),
            request.text(),
            request.text().len() as f64 * 0.1,
            locator,
        ))
    }
}

/// 把上传事件转成字符串依次记录
pub struct RecordingReporter {
    tx: mpsc::UnboundedSender<String>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl Default for RecordingReporter {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

impl RecordingReporter {
    pub async fn next_event(&self, timeout: Duration) -> Option<String> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }
}

impl UploadReporter for RecordingReporter {
    fn upload_sent(&self, cache_key: &CacheKey, _size_bytes: usize) {
        let _ = self.tx.send(format!("sent:{}", cache_key));
    }

    fn upload_confirmed(&self, cache_key: &CacheKey, stored: &CachedAudio) {
        let _ = self.tx.send(format!("confirmed:{}:{}", cache_key, stored.locator));
    }

    fn upload_failed(&self, cache_key: &CacheKey, error: &ServerCacheError) {
        let _ = self.tx.send(format!("failed:{}:{}", cache_key, error));
    }
}

/// 脚本化的缓存服务端
pub struct Responder {
    received: Arc<Mutex<Vec<ClientMessage>>>,
    handle: JoinHandle<()>,
}

impl Responder {
    pub fn received(&self) -> Vec<ClientMessage> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 在服务端一侧按闭包应答，闭包返回要发回的原始帧
pub fn spawn_responder<F>(server: InProcessChannel, respond: F) -> Responder
where
    F: Fn(ClientMessage) -> Vec<String> + Send + 'static,
{
    let mut rx = server.subscribe();
    let received = Arc::new(Mutex::new(Vec::new()));
    let log = received.clone();

    let handle = tokio::spawn(async move {
        while let Ok(frame) = rx.recv().await {
            let Ok(message) = decode_frame::<ClientMessage>(&frame) else {
                continue;
            };
            log.lock().unwrap().push(message.clone());
            for reply in respond(message) {
                let _ = server.send(reply);
            }
        }
    });

    Responder { received, handle }
}

pub fn reply(message: &ServerMessage) -> String {
    encode_frame(message).unwrap()
}
