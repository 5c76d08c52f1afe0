//! Narration Context - Value Objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::NarrationDomainError;
use crate::domain::CacheKey;

/// 进程内临时音频的 scheme
pub const BLOB_SCHEME: &str = "blob:";

/// 旁白请求
///
/// 文本 + 合成参数（音色、模型、格式等），构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationRequest {
    text: String,
    options: BTreeMap<String, String>,
}

impl NarrationRequest {
    pub fn new(text: impl Into<String>) -> Result<Self, NarrationDomainError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(NarrationDomainError::EmptyText);
        }
        Ok(Self {
            text,
            options: BTreeMap::new(),
        })
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// 用于日志的文本预览
    pub fn preview(&self) -> String {
        text_preview(&self.text, 50)
    }
}

/// 音频定位符（URL、文件路径或进程内 blob 引用）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioLocator(String);

impl AudioLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// 无音频
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 仅在当前进程内有效（需要上传才能持久化）
    pub fn is_transient(&self) -> bool {
        self.0.starts_with(BLOB_SCHEME)
    }
}

impl std::fmt::Display for AudioLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 缓存的音频结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAudio {
    pub locator: AudioLocator,
    pub duration_secs: f64,
}

impl CachedAudio {
    pub fn new(locator: AudioLocator, duration_secs: f64) -> Self {
        Self {
            locator,
            duration_secs,
        }
    }
}

/// 解析完成的旁白
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narration {
    pub id: CacheKey,
    pub text: String,
    pub duration_secs: f64,
    pub locator: AudioLocator,
}

impl Narration {
    pub fn new(
        id: CacheKey,
        text: impl Into<String>,
        duration_secs: f64,
        locator: AudioLocator,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            duration_secs,
            locator,
        }
    }

    /// 从缓存条目构造
    pub fn from_cached(id: CacheKey, request: &NarrationRequest, cached: CachedAudio) -> Self {
        Self::new(id, request.text(), cached.duration_secs, cached.locator)
    }

    pub fn has_audio(&self) -> bool {
        !self.locator.is_empty()
    }

    pub fn to_cached(&self) -> CachedAudio {
        CachedAudio::new(self.locator.clone(), self.duration_secs)
    }
}

/// 按字符截断文本
pub fn text_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
