//! Memory Layer - In-Memory State Management
//!
//! 一级音频缓存与进程内临时音频存储

mod audio_cache;
mod blob_store;

pub use audio_cache::MemoryAudioCache;
pub use blob_store::BlobStore;
