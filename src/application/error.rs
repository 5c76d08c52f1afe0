//! 应用层错误定义
//!
//! 后端解析错误原样向调用方传播，缓存层错误不会出现在这里

use thiserror::Error;

use crate::domain::NarrationDomainError;

/// 旁白解析错误
///
/// 需要 `Clone`：去重解析时所有并发等待者观察到同一个错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NarrationError {
    /// 请求无效
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 合成后端失败
    #[error("{provider} failed: {message}")]
    ProviderFailed { provider: String, message: String },

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NarrationError {
    /// 创建后端失败错误
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<NarrationDomainError> for NarrationError {
    fn from(err: NarrationDomainError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
