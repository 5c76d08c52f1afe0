//! File Provider - 使用已有音频文件作为旁白
//!
//! 请求文本即音频路径，返回的定位符是持久的，不需要上传到服务端缓存

use async_trait::async_trait;
use std::path::PathBuf;

use crate::application::error::NarrationError;
use crate::application::ports::NarrationProvider;
use crate::domain::{AudioLocator, CacheKey, CacheKeyGenerator, Narration, NarrationRequest};

/// 无法读取文件时的默认时长（秒）
const FALLBACK_DURATION_SECS: f64 = 3.0;

/// 按 128kbps MP3 估算：16KB/s
const ESTIMATED_BYTES_PER_SEC: f64 = 16.0 * 1024.0;

/// 最短时长（秒）
const MIN_DURATION_SECS: f64 = 0.1;

/// File Provider 配置
#[derive(Debug, Clone, Default)]
pub struct FileProviderConfig {
    /// 相对路径的基准目录
    pub audio_dir: Option<PathBuf>,
}

/// File Provider
pub struct FileProvider {
    config: FileProviderConfig,
    keys: CacheKeyGenerator,
}

impl FileProvider {
    pub fn new(config: FileProviderConfig, keys: CacheKeyGenerator) -> Self {
        Self { config, keys }
    }

    /// 解析音频路径；绝对 URL / 路径原样使用
    pub fn resolve_audio_path(&self, file_path: &str) -> String {
        if is_absolute_locator(file_path) {
            return file_path.to_string();
        }
        match &self.config.audio_dir {
            Some(dir) => dir.join(file_path).to_string_lossy().to_string(),
            None => file_path.to_string(),
        }
    }

    async fn estimate_duration(&self, path: &str) -> f64 {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => (metadata.len() as f64 / ESTIMATED_BYTES_PER_SEC).max(MIN_DURATION_SECS),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to read audio file, using default duration");
                FALLBACK_DURATION_SECS
            }
        }
    }
}

fn is_absolute_locator(path: &str) -> bool {
    ["http://", "https://", "blob:", "data:", "/"]
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

#[async_trait]
impl NarrationProvider for FileProvider {
    fn name(&self) -> &str {
        "File Provider"
    }

    fn generate_key(&self, request: &NarrationRequest) -> CacheKey {
        let dir = self
            .config
            .audio_dir
            .as_ref()
            .map(|d| d.to_string_lossy().to_string())
            .unwrap_or_else(|| "default".to_string());
        self.keys.generate(request.text(), &["file", &dir])
    }

    async fn resolve(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        let path = self.resolve_audio_path(request.text());
        let duration = self.estimate_duration(&path).await;

        Ok(Narration::new(
            self.generate_key(request),
            request.text(),
            duration,
            AudioLocator::new(path),
        ))
    }
}
