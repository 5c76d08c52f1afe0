//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod audio_fetcher;
mod message_channel;
mod narration_provider;
mod server_cache;
mod upload_reporter;

pub use audio_cache::{AudioCachePort, CacheStats};
pub use audio_fetcher::{AudioFetcherPort, FetchError, FetchedAudio};
pub use message_channel::{ChannelError, MessageChannel};
pub use narration_provider::NarrationProvider;
pub use server_cache::{AudioUpload, ServerCacheError, ServerCachePort};
pub use upload_reporter::UploadReporter;
