//! Cached Provider - 两级缓存包装器
//!
//! 查找顺序固定为 内存 -> 服务端 -> 后端，先命中者生效：
//! 1. 内存命中：直接返回
//! 2. 服务端命中：写回内存后返回
//! 3. 全部未命中：调用后端，写入内存；临时音频在后台上传到服务端
//!
//! 后端错误原样返回且不缓存，上传失败只交给 UploadReporter。

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::application::error::NarrationError;
use crate::application::ports::{
    AudioCachePort, AudioFetcherPort, AudioUpload, NarrationProvider, ServerCacheError,
    ServerCachePort, UploadReporter,
};
use crate::domain::{CacheKey, Narration, NarrationRequest};

/// 两级缓存包装器
pub struct CachedProvider<P> {
    name: String,
    inner: P,
    memory: Arc<dyn AudioCachePort>,
    server: Arc<dyn ServerCachePort>,
    fetcher: Arc<dyn AudioFetcherPort>,
    reporter: Arc<dyn UploadReporter>,
}

impl<P: NarrationProvider> CachedProvider<P> {
    pub fn new(
        inner: P,
        memory: Arc<dyn AudioCachePort>,
        server: Arc<dyn ServerCachePort>,
        fetcher: Arc<dyn AudioFetcherPort>,
        reporter: Arc<dyn UploadReporter>,
    ) -> Self {
        Self {
            name: format!("Cached {}", inner.name()),
            inner,
            memory,
            server,
            fetcher,
            reporter,
        }
    }

    /// 后台上传临时音频，不阻塞调用方
    fn spawn_upload(&self, cache_key: CacheKey, narration: &Narration) {
        let locator = narration.locator.clone();
        let duration_secs = narration.duration_secs;
        let provider = self.inner.name().to_string();
        let server = self.server.clone();
        let fetcher = self.fetcher.clone();
        let reporter = self.reporter.clone();

        tokio::spawn(async move {
            let result: Result<(), ServerCacheError> = async {
                let fetched = fetcher
                    .fetch(&locator)
                    .await
                    .map_err(|e| ServerCacheError::Fetch(e.to_string()))?;

                let mut metadata = Map::new();
                metadata.insert(
                    "generatedAt".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
                metadata.insert("provider".to_string(), Value::String(provider));

                server
                    .upload(AudioUpload {
                        cache_key: cache_key.clone(),
                        audio_data: fetched.data,
                        mime_type: fetched.mime_type,
                        duration_secs,
                        metadata,
                    })
                    .await
            }
            .await;

            if let Err(e) = result {
                reporter.upload_failed(&cache_key, &e);
            }
        });
    }
}

#[async_trait]
impl<P: NarrationProvider> NarrationProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_key(&self, request: &NarrationRequest) -> CacheKey {
        self.inner.generate_key(request)
    }

    async fn resolve(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        let cache_key = self.generate_key(request);

        if let Some(cached) = self.memory.get(&cache_key) {
            tracing::debug!(cache_key = %cache_key, text = %request.preview(), "Memory cache hit");
            return Ok(Narration::from_cached(cache_key, request, cached));
        }

        if let Some(cached) = self.server.check(&cache_key).await {
            tracing::debug!(cache_key = %cache_key, text = %request.preview(), "Server cache hit");
            self.memory.put(cache_key.clone(), cached.clone());
            return Ok(Narration::from_cached(cache_key, request, cached));
        }

        tracing::info!(
            cache_key = %cache_key,
            text = %request.preview(),
            provider = %self.inner.name(),
            "Cache miss, delegating to provider"
        );
        let narration = self.inner.resolve(request).await?;

        if narration.has_audio() {
            self.memory.put(cache_key.clone(), narration.to_cached());
            if narration.locator.is_transient() {
                self.spawn_upload(cache_key, &narration);
            }
        }

        Ok(narration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AudioLocator, CachedAudio};
    use crate::infrastructure::events::{MemoryPromotingReporter, TracingUploadReporter};
    use crate::infrastructure::memory::{BlobStore, MemoryAudioCache};
    use crate::infrastructure::server_cache::{
        FileCacheServer, FileStoreConfig, ServerCacheClient, ServerCacheClientConfig,
    };
    use crate::infrastructure::transport::InProcessChannel;
    use crate::test_support::{
        reply, spawn_responder, AudioKind, CountingProvider, RecordingReporter,
    };
    use crate::infrastructure::server_cache::protocol::{ClientMessage, ServerMessage};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn fast_config() -> ServerCacheClientConfig {
        ServerCacheClientConfig {
            availability_timeout: Duration::from_millis(50),
            check_timeout: Duration::from_millis(50),
        }
    }

    fn cached(
        inner: Arc<CountingProvider>,
        memory: Arc<MemoryAudioCache>,
        server: Arc<dyn ServerCachePort>,
        blobs: Arc<BlobStore>,
        reporter: Arc<dyn UploadReporter>,
    ) -> CachedProvider<Arc<CountingProvider>> {
        CachedProvider::new(inner, memory, server, blobs, reporter)
    }

    fn offline(inner: Arc<CountingProvider>) -> (CachedProvider<Arc<CountingProvider>>, Arc<MemoryAudioCache>) {
        let memory = MemoryAudioCache::new().arc();
        let provider = cached(
            inner,
            memory.clone(),
            Arc::new(ServerCacheClient::disconnected()),
            BlobStore::new().arc(),
            Arc::new(TracingUploadReporter),
        );
        (provider, memory)
    }

    #[tokio::test]
    async fn test_second_resolve_served_from_memory() {
        let inner = Arc::new(CountingProvider::new(AudioKind::Durable));
        let (provider, memory) = offline(inner.clone());
        let request = NarrationRequest::new("Hello").unwrap().with_option("voice", "v1");

        let first = provider.resolve(&request).await.unwrap();
        let second = provider.resolve(&request).await.unwrap();

        assert_eq!(inner.calls(), 1);
        assert_eq!(first.duration_secs, second.duration_secs);
        assert_eq!(first.locator, second.locator);
        assert_eq!(first.id, second.id);
        assert_eq!(memory.stats().hit_count, 1);
    }

    #[tokio::test]
    async fn test_empty_audio_is_not_cached() {
        let inner = Arc::new(CountingProvider::new(AudioKind::None));
        let (provider, memory) = offline(inner.clone());
        let request = NarrationRequest::new("Hello").unwrap();

        provider.resolve(&request).await.unwrap();
        provider.resolve(&request).await.unwrap();

        assert_eq!(inner.calls(), 2);
        assert_eq!(memory.stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_is_not_cached() {
        let inner = Arc::new(CountingProvider::new(AudioKind::Durable).failing_first(1));
        let (provider, _) = offline(inner.clone());
        let request = NarrationRequest::new("Hello").unwrap();

        let err = provider.resolve(&request).await.unwrap_err();
        assert_eq!(
            err,
            NarrationError::provider("Counting Provider", "synthetic failure")
        );

        assert!(provider.resolve(&request).await.is_ok());
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_memory_wins_over_server() {
        let (client_end, server_end) = InProcessChannel::pair(16);
        let responder = spawn_responder(server_end, |message| match message {
            ClientMessage::CheckAvailable {} => vec![reply(&ServerMessage::Available {})],
            ClientMessage::CheckAudio { cache_key } => vec![reply(&ServerMessage::AudioExists {
                cache_key,
                file_path: "/server/copy.mp3".to_string(),
                duration: 9.0,
                metadata: None,
            })],
            _ => Vec::new(),
        });
        let server = ServerCacheClient::connect(
            Arc::new(client_end),
            fast_config(),
            Arc::new(TracingUploadReporter),
        );

        let inner = Arc::new(CountingProvider::new(AudioKind::Durable));
        let memory = MemoryAudioCache::new().arc();
        let provider = cached(
            inner.clone(),
            memory.clone(),
            Arc::new(server),
            BlobStore::new().arc(),
            Arc::new(TracingUploadReporter),
        );

        let request = NarrationRequest::new("Hello").unwrap();
        let key = provider.generate_key(&request);
        memory.put(
            key,
            CachedAudio::new(AudioLocator::new("/memory/copy.mp3"), 1.0),
        );

        let narration = provider.resolve(&request).await.unwrap();
        assert_eq!(narration.locator.as_str(), "/memory/copy.mp3");
        assert_eq!(narration.duration_secs, 1.0);
        assert_eq!(inner.calls(), 0);
        assert!(responder.received().is_empty());
    }

    #[tokio::test]
    async fn test_server_hit_writes_through_to_memory() {
        let (client_end, server_end) = InProcessChannel::pair(16);
        let responder = spawn_responder(server_end, |message| match message {
            ClientMessage::CheckAvailable {} => vec![reply(&ServerMessage::Available {})],
            ClientMessage::CheckAudio { cache_key } => vec![reply(&ServerMessage::AudioExists {
                cache_key,
                file_path: "/server/copy.mp3".to_string(),
                duration: 9.0,
                metadata: None,
            })],
            _ => Vec::new(),
        });
        let server = ServerCacheClient::connect(
            Arc::new(client_end),
            fast_config(),
            Arc::new(TracingUploadReporter),
        );

        let inner = Arc::new(CountingProvider::new(AudioKind::Durable));
        let memory = MemoryAudioCache::new().arc();
        let provider = cached(
            inner.clone(),
            memory.clone(),
            Arc::new(server),
            BlobStore::new().arc(),
            Arc::new(TracingUploadReporter),
        );
        let request = NarrationRequest::new("Hello").unwrap();

        let first = provider.resolve(&request).await.unwrap();
        let second = provider.resolve(&request).await.unwrap();

        assert_eq!(first.locator.as_str(), "/server/copy.mp3");
        assert_eq!(first, second);
        assert_eq!(inner.calls(), 0);
        // 探测 + 一次 check，第二次解析不再访问服务端
        assert_eq!(responder.received().len(), 2);
        assert_eq!(memory.stats().total_entries, 1);
    }

    #[tokio::test]
    async fn test_unresponsive_server_falls_back_to_provider() {
        let (client_end, server_end) = InProcessChannel::pair(16);
        let _responder = spawn_responder(server_end, |message| match message {
            ClientMessage::CheckAvailable {} => vec![reply(&ServerMessage::Available {})],
            _ => Vec::new(),
        });
        let server = ServerCacheClient::connect(
            Arc::new(client_end),
            fast_config(),
            Arc::new(TracingUploadReporter),
        );

        let inner = Arc::new(
            CountingProvider::new(AudioKind::Durable).with_latency(Duration::from_millis(30)),
        );
        let provider = cached(
            inner.clone(),
            MemoryAudioCache::new().arc(),
            Arc::new(server),
            BlobStore::new().arc(),
            Arc::new(TracingUploadReporter),
        );

        let started = Instant::now();
        let narration = provider
            .resolve(&NarrationRequest::new("Hello").unwrap())
            .await
            .unwrap();

        assert_eq!(narration.locator.as_str(), "/audio/Hello.mp3");
        assert_eq!(inner.calls(), 1);
        // check 超时 50ms + 后端 30ms，留出调度余量
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_transient_audio_uploaded_and_found_by_fresh_client() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            FileCacheServer::new(FileStoreConfig {
                audio_dir: dir.path().to_path_buf(),
                ..Default::default()
            })
            .await
            .unwrap(),
        );
        let (client_end, server_end) = InProcessChannel::pair(16);
        let _server_task = store.clone().spawn(Arc::new(server_end));

        let reporter = Arc::new(RecordingReporter::default());
        let client_end = Arc::new(client_end);
        let server = Arc::new(ServerCacheClient::connect(
            client_end.clone(),
            fast_config(),
            reporter.clone(),
        ));

        let blobs = BlobStore::new().arc();
        let inner = Arc::new(CountingProvider::new(AudioKind::Transient(blobs.clone())));
        let provider = cached(
            inner.clone(),
            MemoryAudioCache::new().arc(),
            server,
            blobs,
            reporter.clone(),
        );
        let request = NarrationRequest::new("Hello").unwrap();
        let key = provider.generate_key(&request);

        let narration = provider.resolve(&request).await.unwrap();
        assert!(narration.locator.is_transient());

        assert_eq!(
            reporter.next_event(Duration::from_secs(2)).await,
            Some(format!("sent:{}", key))
        );
        let confirmed = reporter.next_event(Duration::from_secs(2)).await.unwrap();
        assert!(confirmed.starts_with(&format!("confirmed:{}:", key)));
        assert!(dir.path().join(format!("{}.mp3", key)).exists());

        // 新进程（新的内存缓存与客户端）从服务端命中
        let fresh_inner = Arc::new(CountingProvider::new(AudioKind::Durable));
        let fresh = cached(
            fresh_inner.clone(),
            MemoryAudioCache::new().arc(),
            Arc::new(ServerCacheClient::connect(
                client_end,
                fast_config(),
                Arc::new(TracingUploadReporter),
            )),
            BlobStore::new().arc(),
            Arc::new(TracingUploadReporter),
        );
        let served = fresh.resolve(&request).await.unwrap();

        assert_eq!(fresh_inner.calls(), 0);
        assert!(!served.locator.is_transient());
        assert_eq!(served.duration_secs, narration.duration_secs);
    }

    #[tokio::test]
    async fn test_confirmed_upload_promotes_memory_entry() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            FileCacheServer::new(FileStoreConfig {
                audio_dir: dir.path().to_path_buf(),
                ..Default::default()
            })
            .await
            .unwrap(),
        );
        let (client_end, server_end) = InProcessChannel::pair(16);
        let _server_task = store.clone().spawn(Arc::new(server_end));

        let memory = MemoryAudioCache::new().arc();
        let reporter: Arc<dyn UploadReporter> = Arc::new(MemoryPromotingReporter::new(
            memory.clone(),
            Arc::new(TracingUploadReporter),
        ));
        let server = ServerCacheClient::connect(Arc::new(client_end), fast_config(), reporter.clone());

        let blobs = BlobStore::new().arc();
        let inner = Arc::new(CountingProvider::new(AudioKind::Transient(blobs.clone())));
        let provider = cached(inner.clone(), memory.clone(), Arc::new(server), blobs, reporter);
        let request = NarrationRequest::new("Hello").unwrap();

        let first = provider.resolve(&request).await.unwrap();
        assert!(first.locator.is_transient());

        let key = provider.generate_key(&request);
        let deadline = Instant::now() + Duration::from_secs(2);
        while memory.get(&key).map_or(true, |c| c.locator.is_transient()) {
            assert!(Instant::now() < deadline, "upload was never confirmed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let second = provider.resolve(&request).await.unwrap();
        assert!(!second.locator.is_transient());
        assert!(second.locator.as_str().ends_with(&format!("{}.mp3", key)));
        assert_eq!(second.duration_secs, first.duration_secs);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_durable_audio_is_not_uploaded() {
        let (client_end, server_end) = InProcessChannel::pair(16);
        let responder = spawn_responder(server_end, |message| match message {
            ClientMessage::CheckAvailable {} => vec![reply(&ServerMessage::Available {})],
            ClientMessage::CheckAudio { cache_key } => {
                vec![reply(&ServerMessage::AudioNotFound { cache_key })]
            }
            _ => Vec::new(),
        });
        let server = ServerCacheClient::connect(
            Arc::new(client_end),
            fast_config(),
            Arc::new(TracingUploadReporter),
        );
        let inner = Arc::new(CountingProvider::new(AudioKind::Durable));
        let provider = cached(
            inner,
            MemoryAudioCache::new().arc(),
            Arc::new(server),
            BlobStore::new().arc(),
            Arc::new(TracingUploadReporter),
        );

        provider
            .resolve(&NarrationRequest::new("Hello").unwrap())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!responder
            .received()
            .iter()
            .any(|m| matches!(m, ClientMessage::UploadAudio { .. })));
    }

    #[tokio::test]
    async fn test_upload_fetch_failure_is_reported_not_raised() {
        let blobs = BlobStore::new().arc();
        let inner = Arc::new(CountingProvider::new(AudioKind::Transient(blobs)));
        let reporter = Arc::new(RecordingReporter::default());
        // 后端写入的 blob store 与 fetcher 不是同一个，读取必然失败
        let provider = cached(
            inner,
            MemoryAudioCache::new().arc(),
            Arc::new(ServerCacheClient::disconnected()),
            BlobStore::new().arc(),
            reporter.clone(),
        );

        let narration = provider
            .resolve(&NarrationRequest::new("Hello").unwrap())
            .await
            .unwrap();
        assert!(narration.locator.is_transient());

        let event = reporter.next_event(Duration::from_secs(1)).await.unwrap();
        assert!(event.starts_with("failed:"));
        assert!(event.contains("Failed to fetch audio bytes"));
    }

    #[test]
    fn test_name_wraps_inner() {
        let inner = Arc::new(CountingProvider::new(AudioKind::None));
        let provider = CachedProvider::new(
            inner,
            MemoryAudioCache::new().arc(),
            Arc::new(ServerCacheClient::disconnected()),
            BlobStore::new().arc(),
            Arc::new(TracingUploadReporter),
        );
        assert_eq!(provider.name(), "Cached Counting Provider");
    }
}
