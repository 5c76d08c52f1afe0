//! Upload Reporter Port - 后台上传结果的观察者
//!
//! 上传不在旁白解析的关键路径上，其结果只能通过这里观察

use crate::application::ports::ServerCacheError;
use crate::domain::{CacheKey, CachedAudio};

/// Upload Reporter Port
pub trait UploadReporter: Send + Sync {
    /// 上传消息已发出
    fn upload_sent(&self, cache_key: &CacheKey, size_bytes: usize);

    /// 服务端确认已保存，`stored` 为服务端的持久定位符与时长
    fn upload_confirmed(&self, cache_key: &CacheKey, stored: &CachedAudio);

    /// 上传失败（读取、编码、发送失败或服务端拒绝）
    fn upload_failed(&self, cache_key: &CacheKey, error: &ServerCacheError);
}
