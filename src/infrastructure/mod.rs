//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod memory;
pub mod server_cache;
pub mod transport;

pub use adapters::{FileProvider, MockProvider};
pub use events::{MemoryPromotingReporter, TracingUploadReporter};
pub use memory::{BlobStore, MemoryAudioCache};
pub use server_cache::{FileCacheServer, ServerCacheClient};
pub use transport::InProcessChannel;
