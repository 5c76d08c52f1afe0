//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（narrator.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["narrator", "narrator.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "NARRATOR";

/// 加载应用配置
///
/// # 环境变量示例
/// - `NARRATOR_CACHE__SERVER_ENABLED=false`
/// - `NARRATOR_CACHE__KEY_DIGEST=md5`
/// - `NARRATOR_STORE__AUDIO_DIR=/var/cache/narrator`
/// - `NARRATOR_MOCK__LATENCY_MS=0`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索工作目录下的默认配置文件
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .set_default("cache.server_enabled", true)?
        .set_default("cache.availability_timeout_ms", 500)?
        .set_default("cache.check_timeout_ms", 1000)?
        .set_default("cache.key_digest", "compact")?
        .set_default("store.audio_dir", "narrator-cache")?
        .set_default("store.max_file_size_mb", 50)?
        .set_default("mock.words_per_minute", 120)?
        .set_default("mock.latency_ms", 200)?
        .set_default("mock.emit_audio", true)?
        .set_default("log.level", "info")?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 层级分隔符: __ (双下划线)
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.cache.availability_timeout_ms == 0 || config.cache.check_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Server cache timeouts cannot be 0".to_string(),
        ));
    }

    if config.store.audio_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Audio directory cannot be empty".to_string(),
        ));
    }

    if config.store.allowed_mime_types.is_empty() {
        return Err(ConfigError::ValidationError(
            "At least one MIME type must be allowed".to_string(),
        ));
    }

    if config.mock.words_per_minute == 0 {
        return Err(ConfigError::ValidationError(
            "Words per minute cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Narrator Configuration ===");
    tracing::info!("Server Cache Enabled: {}", config.cache.server_enabled);
    if config.cache.server_enabled {
        tracing::info!("Availability Timeout: {}ms", config.cache.availability_timeout_ms);
        tracing::info!("Check Timeout: {}ms", config.cache.check_timeout_ms);
        tracing::info!("Audio Directory: {:?}", config.store.audio_dir);
        tracing::info!("Max File Size: {}MB", config.store.max_file_size_mb);
    }
    tracing::info!("Key Digest: {:?}", config.cache.key_digest);
    tracing::info!("Mock Words Per Minute: {}", config.mock.words_per_minute);
    tracing::info!("Mock Latency: {}ms", config.mock.latency_ms);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("==============================");
}
