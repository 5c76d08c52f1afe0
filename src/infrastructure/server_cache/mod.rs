//! Server Cache - 二级持久化缓存
//!
//! - protocol: 消息格式
//! - correlator: 一次性关联请求表
//! - client: 客户端（ServerCachePort 实现）
//! - file_store: 文件系统缓存服务（协议的服务端）

mod client;
mod correlator;
mod file_store;
pub mod protocol;

pub use client::{ServerCacheClient, ServerCacheClientConfig};
pub use correlator::{Correlator, PendingReply};
pub use file_store::{FileCacheServer, FileStoreConfig, StoreError, StoredAudio};
