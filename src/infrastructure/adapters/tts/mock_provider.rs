//! Mock Provider - 用于测试和演示的旁白后端
//!
//! 不调用任何合成服务，按语速估算时长，可选地生成临时音频

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::application::error::NarrationError;
use crate::application::ports::NarrationProvider;
use crate::domain::{AudioLocator, CacheKey, CacheKeyGenerator, Narration, NarrationRequest};
use crate::infrastructure::memory::BlobStore;

/// 生成音频的 mime 类型
const MOCK_MIME_TYPE: &str = "audio/wav";

/// 采样率（8kHz 8bit 单声道 PCM）
const MOCK_SAMPLE_RATE: u32 = 8000;

/// Mock Provider 配置
#[derive(Debug, Clone)]
pub struct MockProviderConfig {
    /// 语速（词/分钟）
    pub words_per_minute: u32,
    /// 模拟合成延迟
    pub latency: Duration,
    /// 是否生成临时音频（否则返回空定位符）
    pub emit_audio: bool,
}

impl Default for MockProviderConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 120,
            latency: Duration::from_millis(200),
            emit_audio: true,
        }
    }
}

/// Mock Provider
pub struct MockProvider {
    config: MockProviderConfig,
    keys: CacheKeyGenerator,
    blobs: Arc<BlobStore>,
}

impl MockProvider {
    pub fn new(config: MockProviderConfig, keys: CacheKeyGenerator, blobs: Arc<BlobStore>) -> Self {
        tracing::info!(
            words_per_minute = config.words_per_minute,
            latency_ms = config.latency.as_millis() as u64,
            emit_audio = config.emit_audio,
            "MockProvider initialized"
        );
        Self {
            config,
            keys,
            blobs,
        }
    }

    /// 按语速估算时长（秒）
    pub fn estimate_duration(&self, text: &str) -> f64 {
        let words = text.split_whitespace().count().max(1);
        words as f64 / self.config.words_per_minute as f64 * 60.0
    }
}

/// 生成指定时长的静音 WAV（RIFF 头 + 8bit PCM，静音值 0x80）
fn silent_wav(duration_secs: f64) -> Vec<u8> {
    let data_len = (duration_secs * MOCK_SAMPLE_RATE as f64) as u32;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // 单声道
    wav.extend_from_slice(&MOCK_SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&MOCK_SAMPLE_RATE.to_le_bytes()); // byte rate
    wav.extend_from_slice(&1u16.to_le_bytes()); // block align
    wav.extend_from_slice(&8u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0x80);
    wav
}

#[async_trait]
impl NarrationProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock Provider"
    }

    fn generate_key(&self, request: &NarrationRequest) -> CacheKey {
        // 未指定音色时沿用 ["mock", wpm]，与已有缓存文件的 key 一致
        let wpm = self.config.words_per_minute.to_string();
        let mut discriminators = vec!["mock", wpm.as_str()];
        if let Some(voice) = request.option("voice") {
            discriminators.push(voice);
        }
        self.keys.generate(request.text(), &discriminators)
    }

    async fn resolve(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        tracing::debug!(
            text_len = request.text().len(),
            voice = ?request.option("voice"),
            "MockProvider: synthesizing"
        );

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        let duration = self.estimate_duration(request.text());
        let locator = if self.config.emit_audio {
            self.blobs.insert(silent_wav(duration), MOCK_MIME_TYPE)
        } else {
            AudioLocator::empty()
        };

        Ok(Narration::new(
            self.generate_key(request),
            request.text(),
            duration,
            locator,
        ))
    }
}
