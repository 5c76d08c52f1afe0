//! Audio Cache Port - 一级（进程内）音频缓存
//!
//! 定义内存缓存的抽象接口，具体实现使用 DashMap

use crate::domain::{CacheKey, CachedAudio};

/// Audio Cache Port
///
/// 进程生命周期内有效，无淘汰、无 TTL、无容量上限
pub trait AudioCachePort: Send + Sync {
    /// 根据缓存 key 获取缓存结果
    fn get(&self, cache_key: &CacheKey) -> Option<CachedAudio>;

    /// 写入缓存结果（覆盖已有条目）
    fn put(&self, cache_key: CacheKey, audio: CachedAudio);

    /// 获取缓存统计信息
    fn stats(&self) -> CacheStats;
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}
