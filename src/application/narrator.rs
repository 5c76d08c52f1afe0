//! Narrator - 旁白解析门面
//!
//! 持有组合好的 provider，提供单条解析和批量预取

use futures_util::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;

use super::error::NarrationError;
use super::ports::NarrationProvider;
use crate::domain::{Narration, NarrationRequest};

/// 旁白门面
#[derive(Clone)]
pub struct Narrator {
    provider: Arc<dyn NarrationProvider>,
}

impl Narrator {
    pub fn new(provider: Arc<dyn NarrationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// 解析单条旁白，失败时记录日志后返回错误
    pub async fn resolve(&self, request: &NarrationRequest) -> Result<Narration, NarrationError> {
        self.provider.resolve(request).await.map_err(|e| {
            tracing::error!(
                provider = %self.provider.name(),
                text = %request.preview(),
                error = %e,
                "Narration failed"
            );
            e
        })
    }

    /// 创建批量预取
    pub fn create_batch(&self) -> NarrationBatch {
        NarrationBatch {
            narrator: self.clone(),
            requests: Vec::new(),
        }
    }
}

/// 批量预取：先收集，再并发解析
pub struct NarrationBatch {
    narrator: Narrator,
    requests: Vec<NarrationRequest>,
}

impl NarrationBatch {
    pub fn speak(&mut self, request: NarrationRequest) -> &mut Self {
        self.requests.push(request);
        self
    }

    /// 按文本加入（无合成参数），空文本返回 `InvalidRequest`
    pub fn speak_text(&mut self, text: impl Into<String>) -> Result<&mut Self, NarrationError> {
        let request = NarrationRequest::new(text)?;
        Ok(self.speak(request))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// 并发解析全部请求，结果顺序与加入顺序一致
    ///
    /// 任意一条失败即返回该错误
    pub async fn resolve(self) -> Result<Vec<Narration>, NarrationError> {
        if self.requests.is_empty() {
            tracing::warn!("Narration batch is empty");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let narrator = &self.narrator;
        let narrations =
            try_join_all(self.requests.iter().map(|request| narrator.resolve(request))).await?;

        tracing::info!(
            count = narrations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Narration batch resolved"
        );
        Ok(narrations)
    }
}
