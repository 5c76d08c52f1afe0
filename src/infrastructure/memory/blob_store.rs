//! In-Memory Blob Store - 进程内临时音频
//!
//! 后端合成的音频先放在这里，以 `blob:<uuid>` 定位符交给调用方

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{AudioFetcherPort, FetchError, FetchedAudio};
use crate::domain::narration::BLOB_SCHEME;
use crate::domain::AudioLocator;

#[derive(Debug, Clone)]
struct BlobEntry {
    data: Vec<u8>,
    mime_type: String,
}

/// 临时音频存储
pub struct BlobStore {
    blobs: DashMap<Uuid, BlobEntry>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 存入音频，返回 blob 定位符
    pub fn insert(&self, data: Vec<u8>, mime_type: impl Into<String>) -> AudioLocator {
        let id = Uuid::new_v4();
        let size = data.len();
        self.blobs.insert(
            id,
            BlobEntry {
                data,
                mime_type: mime_type.into(),
            },
        );
        tracing::debug!(blob_id = %id, size_bytes = size, "Blob stored");
        AudioLocator::new(format!("{}{}", BLOB_SCHEME, id))
    }

    /// 释放 blob，返回是否存在
    pub fn revoke(&self, locator: &AudioLocator) -> bool {
        parse_blob_id(locator)
            .map(|id| self.blobs.remove(&id).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_blob_id(locator: &AudioLocator) -> Option<Uuid> {
    locator
        .as_str()
        .strip_prefix(BLOB_SCHEME)
        .and_then(|id| Uuid::parse_str(id).ok())
}

#[async_trait]
impl AudioFetcherPort for BlobStore {
    async fn fetch(&self, locator: &AudioLocator) -> Result<FetchedAudio, FetchError> {
        if !locator.is_transient() {
            return Err(FetchError::Unsupported(locator.to_string()));
        }

        let id = parse_blob_id(locator).ok_or_else(|| FetchError::NotFound(locator.to_string()))?;
        let entry = self
            .blobs
            .get(&id)
            .ok_or_else(|| FetchError::NotFound(locator.to_string()))?;

        Ok(FetchedAudio {
            data: entry.data.clone(),
            mime_type: entry.mime_type.clone(),
        })
    }
}
