//! 应用层 - 旁白解析编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（NarrationProvider、AudioCache、ServerCache、MessageChannel 等）
//! - providers: 缓存与并发合并包装器
//! - narrator: 对外门面与批量预取
//! - error: 应用层错误定义

pub mod error;
mod narrator;
pub mod ports;
pub mod providers;

pub use error::NarrationError;
pub use narrator::{NarrationBatch, Narrator};
pub use providers::{CachedProvider, DedupedProvider};

pub use ports::{
    // Memory cache
    AudioCachePort,
    CacheStats,
    // Transient audio
    AudioFetcherPort,
    FetchError,
    FetchedAudio,
    // Transport
    ChannelError,
    MessageChannel,
    // Provider
    NarrationProvider,
    // Server cache
    AudioUpload,
    ServerCacheError,
    ServerCachePort,
    UploadReporter,
};
