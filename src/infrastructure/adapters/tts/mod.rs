//! TTS Adapter - 旁白后端实现

mod file_provider;
mod mock_provider;

pub use file_provider::{FileProvider, FileProviderConfig};
pub use mock_provider::{MockProvider, MockProviderConfig};
