//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::KeyDigest;
use crate::infrastructure::adapters::MockProviderConfig;
use crate::infrastructure::server_cache::{FileStoreConfig, ServerCacheClientConfig};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 服务端缓存存储配置
    #[serde(default)]
    pub store: StoreConfig,

    /// Mock 后端配置
    #[serde(default)]
    pub mock: MockConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 是否启用服务端缓存
    #[serde(default = "default_server_enabled")]
    pub server_enabled: bool,

    /// 可用性探测超时（毫秒）
    #[serde(default = "default_availability_timeout_ms")]
    pub availability_timeout_ms: u64,

    /// 单次查询超时（毫秒）
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,

    /// 缓存 key 摘要算法
    /// 可选: compact, md5
    #[serde(default)]
    pub key_digest: KeyDigest,
}

fn default_server_enabled() -> bool {
    true
}

fn default_availability_timeout_ms() -> u64 {
    500
}

fn default_check_timeout_ms() -> u64 {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            server_enabled: default_server_enabled(),
            availability_timeout_ms: default_availability_timeout_ms(),
            check_timeout_ms: default_check_timeout_ms(),
            key_digest: KeyDigest::default(),
        }
    }
}

impl CacheConfig {
    pub fn client_config(&self) -> ServerCacheClientConfig {
        ServerCacheClientConfig {
            availability_timeout: Duration::from_millis(self.availability_timeout_ms),
            check_timeout: Duration::from_millis(self.check_timeout_ms),
        }
    }
}

/// 服务端缓存存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// 音频存储目录
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    /// 单个文件最大大小（MB）
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// 允许的 MIME 类型
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("narrator-cache")
}

fn default_max_file_size_mb() -> u64 {
    50
}

fn default_allowed_mime_types() -> Vec<String> {
    ["audio/mpeg", "audio/wav", "audio/ogg", "audio/mp3"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            max_file_size_mb: default_max_file_size_mb(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

impl StoreConfig {
    pub fn file_store_config(&self) -> FileStoreConfig {
        FileStoreConfig {
            audio_dir: self.audio_dir.clone(),
            max_file_size_bytes: self.max_file_size_mb * 1024 * 1024,
            allowed_mime_types: self.allowed_mime_types.clone(),
        }
    }
}

/// Mock 后端配置
#[derive(Debug, Clone, Deserialize)]
pub struct MockConfig {
    /// 语速（词/分钟）
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,

    /// 模拟延迟（毫秒）
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// 是否生成音频（关闭时只返回时长）
    #[serde(default = "default_emit_audio")]
    pub emit_audio: bool,
}

fn default_words_per_minute() -> u32 {
    120
}

fn default_latency_ms() -> u64 {
    200
}

fn default_emit_audio() -> bool {
    true
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            words_per_minute: default_words_per_minute(),
            latency_ms: default_latency_ms(),
            emit_audio: default_emit_audio(),
        }
    }
}

impl MockConfig {
    pub fn provider_config(&self) -> MockProviderConfig {
        MockProviderConfig {
            words_per_minute: self.words_per_minute,
            latency: Duration::from_millis(self.latency_ms),
            emit_audio: self.emit_audio,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
