//! In-Memory Audio Cache Implementation

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{AudioCachePort, CacheStats};
use crate::domain::{CacheKey, CachedAudio};

/// 内存音频缓存
pub struct MemoryAudioCache {
    /// cache_key -> CachedAudio
    entries: DashMap<CacheKey, CachedAudio>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl MemoryAudioCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for MemoryAudioCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCachePort for MemoryAudioCache {
    fn get(&self, cache_key: &CacheKey) -> Option<CachedAudio> {
        match self.entries.get(cache_key) {
            Some(entry) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, cache_key: CacheKey, audio: CachedAudio) {
        tracing::debug!(
            cache_key = %cache_key,
            locator = %audio.locator,
            duration_secs = audio.duration_secs,
            "Audio cached in memory"
        );
        self.entries.insert(cache_key, audio);
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}
