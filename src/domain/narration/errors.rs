//! Narration Context - Errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrationDomainError {
    #[error("旁白文本不能为空")]
    EmptyText,
}
