//! Narration Context - 旁白限界上下文
//!
//! 职责:
//! - 旁白请求与结果
//! - 音频定位符分类（临时 blob / 持久路径）

mod errors;
mod value_objects;

pub use errors::NarrationDomainError;
pub use value_objects::{
    text_preview, AudioLocator, CachedAudio, Narration, NarrationRequest, BLOB_SCHEME,
};
