//! Narration Provider Port - 旁白合成后端抽象
//!
//! 缓存与去重包装器也实现此接口，可以任意嵌套

use async_trait::async_trait;

use crate::application::error::NarrationError;
use crate::domain::{CacheKey, Narration, NarrationRequest};

/// Narration Provider Port
#[async_trait]
pub trait NarrationProvider: Send + Sync {
    /// 后端名称（用于日志）
    fn name(&self) -> &str;

    /// 生成缓存 key
    ///
    /// 由具体后端决定哪些参数参与 key 计算
    fn generate_key(&self, request: &NarrationRequest) -> CacheKey;

    /// 解析旁白请求
    async fn resolve(&self, request: &NarrationRequest) -> Result<Narration, NarrationError>;
}

#[async_trait]
impl<P: NarrationProvider + ?Sized> NarrationProvider for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate_key(&self, request: &NarrationRequest) -> CacheKey {
        (**self).generate_key(request)
    }

    async fn resolve(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        (**self).resolve(request).await
    }
}
