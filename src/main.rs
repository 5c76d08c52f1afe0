//! Narrator - 旁白解析演示
//!
//! 组合方式：Narrator -> DedupedProvider -> CachedProvider -> MockProvider，
//! 服务端缓存由同进程内的 FileCacheServer 通过消息通道提供

use std::sync::Arc;
use std::time::Duration;

use narrator::application::ports::{AudioCachePort, ServerCachePort, UploadReporter};
use narrator::application::{CachedProvider, DedupedProvider, Narrator};
use narrator::config::{load_config, print_config};
use narrator::domain::CacheKeyGenerator;
use narrator::infrastructure::adapters::MockProvider;
use narrator::infrastructure::events::{MemoryPromotingReporter, TracingUploadReporter};
use narrator::infrastructure::memory::{BlobStore, MemoryAudioCache};
use narrator::infrastructure::server_cache::{FileCacheServer, ServerCacheClient};
use narrator::infrastructure::transport::{InProcessChannel, DEFAULT_CHANNEL_CAPACITY};

const SAMPLE_LINES: &[&str] = &[
    "Welcome back, traveller.",
    "The gate is closed until dawn.",
    "Welcome back, traveller.",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let log_filter = format!("{},narrator={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Narrator - cached narration resolution");
    print_config(&config);

    let blobs = BlobStore::new().arc();
    let memory = MemoryAudioCache::new().arc();
    let reporter: Arc<dyn UploadReporter> = Arc::new(MemoryPromotingReporter::new(
        memory.clone(),
        Arc::new(TracingUploadReporter),
    ));

    // 服务端缓存
    let server: Arc<dyn ServerCachePort> = if config.cache.server_enabled {
        let store = Arc::new(FileCacheServer::new(config.store.file_store_config()).await?);
        let (client_end, server_end) = InProcessChannel::pair(DEFAULT_CHANNEL_CAPACITY);
        store.spawn(Arc::new(server_end));
        Arc::new(ServerCacheClient::connect(
            Arc::new(client_end),
            config.cache.client_config(),
            reporter.clone(),
        ))
    } else {
        Arc::new(ServerCacheClient::disconnected())
    };

    let mock = MockProvider::new(
        config.mock.provider_config(),
        CacheKeyGenerator::new(config.cache.key_digest),
        blobs.clone(),
    );
    let cached = CachedProvider::new(mock, memory.clone(), server, blobs, reporter);
    let narrator = Narrator::new(Arc::new(DedupedProvider::new(cached)));
    tracing::info!(provider = %narrator.provider_name(), "Narrator ready");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let texts: Vec<String> = if args.is_empty() {
        SAMPLE_LINES.iter().map(|s| s.to_string()).collect()
    } else {
        args
    };

    for pass in 1..=2 {
        let mut batch = narrator.create_batch();
        for text in &texts {
            batch.speak_text(text.as_str())?;
        }

        for narration in batch.resolve().await? {
            tracing::info!(
                pass = pass,
                id = %narration.id,
                duration_secs = narration.duration_secs,
                locator = %narration.locator,
                "Resolved narration"
            );
        }

        // 留出后台上传的时间
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let stats = memory.stats();
    tracing::info!(
        entries = stats.total_entries,
        hits = stats.hit_count,
        misses = stats.miss_count,
        "Memory cache stats"
    );

    Ok(())
}
