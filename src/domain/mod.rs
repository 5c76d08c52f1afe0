//! Domain Layer - 领域层
//!
//! - Narration Context: 旁白请求、结果与音频定位符
//! - Cache Key: 稳定的内容寻址缓存 key

pub mod narration;

mod cache_key;

pub use cache_key::{generate_cache_key, CacheKey, CacheKeyGenerator, KeyDigest};
pub use narration::{
    AudioLocator, CachedAudio, Narration, NarrationDomainError, NarrationRequest,
};
