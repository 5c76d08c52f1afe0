//! Providers - 可组合的旁白解析包装器
//!
//! 推荐组合：`DedupedProvider<CachedProvider<P>>`，合并在先、缓存在后

mod cached_provider;
mod deduped_provider;

pub use cached_provider::CachedProvider;
pub use deduped_provider::DedupedProvider;
