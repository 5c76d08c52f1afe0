//! Upload Reporters - 后台上传结果观察者
//!
//! - TracingUploadReporter: 只写日志
//! - MemoryPromotingReporter: 服务端确认后把内存缓存中的临时定位符换成持久路径

use std::sync::Arc;

use crate::application::ports::{AudioCachePort, ServerCacheError, UploadReporter};
use crate::domain::{CacheKey, CachedAudio};

/// 默认的上传结果观察者：只写日志
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUploadReporter;

impl UploadReporter for TracingUploadReporter {
    fn upload_sent(&self, cache_key: &CacheKey, size_bytes: usize) {
        tracing::debug!(
            cache_key = %cache_key,
            size_bytes = size_bytes,
            "Audio upload sent to server cache"
        );
    }

    fn upload_confirmed(&self, cache_key: &CacheKey, stored: &CachedAudio) {
        tracing::info!(
            cache_key = %cache_key,
            file_path = %stored.locator,
            "Server upload successful"
        );
    }

    fn upload_failed(&self, cache_key: &CacheKey, error: &ServerCacheError) {
        tracing::warn!(
            cache_key = %cache_key,
            error = %error,
            "Failed to upload audio to server cache"
        );
    }
}

/// 上传确认后更新内存缓存，其余事件原样转发
pub struct MemoryPromotingReporter {
    memory: Arc<dyn AudioCachePort>,
    inner: Arc<dyn UploadReporter>,
}

impl MemoryPromotingReporter {
    pub fn new(memory: Arc<dyn AudioCachePort>, inner: Arc<dyn UploadReporter>) -> Self {
        Self { memory, inner }
    }
}

impl UploadReporter for MemoryPromotingReporter {
    fn upload_sent(&self, cache_key: &CacheKey, size_bytes: usize) {
        self.inner.upload_sent(cache_key, size_bytes);
    }

    fn upload_confirmed(&self, cache_key: &CacheKey, stored: &CachedAudio) {
        self.memory.put(cache_key.clone(), stored.clone());
        tracing::debug!(
            cache_key = %cache_key,
            locator = %stored.locator,
            "Memory cache entry promoted to server copy"
        );
        self.inner.upload_confirmed(cache_key, stored);
    }

    fn upload_failed(&self, cache_key: &CacheKey, error: &ServerCacheError) {
        self.inner.upload_failed(cache_key, error);
    }
}
