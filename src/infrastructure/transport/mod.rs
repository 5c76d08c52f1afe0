//! Transport - MessageChannel 实现

mod in_process;

pub use in_process::{InProcessChannel, DEFAULT_CHANNEL_CAPACITY};
