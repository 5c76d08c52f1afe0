//! Deduped Provider - 并发请求合并
//!
//! 同一缓存 key 同时只有一次在途解析，并发调用方共享同一结果（成功或失败）。
//! 解析结束后立即移除在途记录，之后的调用重新进入内层（通常由缓存层接住）。

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::sync::Arc;

use crate::application::error::NarrationError;
use crate::application::ports::NarrationProvider;
use crate::domain::{CacheKey, Narration, NarrationRequest};

type SharedResolve = Shared<BoxFuture<'static, Result<Narration, NarrationError>>>;

/// 并发合并包装器
pub struct DedupedProvider<P> {
    name: String,
    inner: Arc<P>,
    in_flight: Arc<DashMap<CacheKey, SharedResolve>>,
}

impl<P: NarrationProvider + 'static> DedupedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            name: format!("Deduped {}", inner.name()),
            inner: Arc::new(inner),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// 当前在途的 key 数量
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// 启动一次内层解析
    ///
    /// 解析在独立任务中运行，所有调用方都放弃等待时也会完成并清理在途记录
    fn start(&self, cache_key: CacheKey, request: &NarrationRequest) -> SharedResolve {
        let inner = self.inner.clone();
        let in_flight = self.in_flight.clone();
        let request = request.clone();

        let task = tokio::spawn(async move {
            let result = inner.resolve(&request).await;
            in_flight.remove(&cache_key);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Narration task aborted");
                Err(NarrationError::internal(format!("narration task aborted: {}", e)))
            })
        }
        .boxed()
        .shared()
    }
}

#[async_trait]
impl<P: NarrationProvider + 'static> NarrationProvider for DedupedProvider<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_key(&self, request: &NarrationRequest) -> CacheKey {
        self.inner.generate_key(request)
    }

    async fn resolve(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        let cache_key = self.generate_key(request);

        // 插入时持有分片锁，任务中的 remove 一定发生在插入之后
        let shared = match self.in_flight.entry(cache_key.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(cache_key = %cache_key, "Joining in-flight narration");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let shared = self.start(cache_key, request);
                entry.insert(shared.clone());
                shared
            }
        };

        shared.await
    }
}
