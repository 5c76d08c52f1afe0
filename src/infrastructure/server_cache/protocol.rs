//! Server Cache Protocol - 消息格式
//!
//! 每一帧都是 JSON：`{"event": "<topic>", "data": {...}}`，字段使用 camelCase

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// 协议错误
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
}

/// 客户端 -> 服务端
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// 可用性探测
    #[serde(rename = "narrator:check-available")]
    CheckAvailable {},

    /// 查询缓存
    #[serde(rename = "narrator:check-audio", rename_all = "camelCase")]
    CheckAudio { cache_key: String },

    /// 上传音频
    #[serde(rename = "narrator:upload-audio", rename_all = "camelCase")]
    UploadAudio {
        /// base64 data URL
        data: String,
        mime_type: String,
        cache_key: String,
        duration: f64,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
}

/// 服务端 -> 客户端
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// 探测应答
    #[serde(rename = "narrator:available")]
    Available {},

    /// 命中
    #[serde(rename = "narrator:audio-exists", rename_all = "camelCase")]
    AudioExists {
        cache_key: String,
        file_path: String,
        duration: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },

    /// 未命中
    #[serde(rename = "narrator:audio-not-found", rename_all = "camelCase")]
    AudioNotFound { cache_key: String },

    /// 上传成功
    #[serde(rename = "narrator:upload-success", rename_all = "camelCase")]
    UploadSuccess {
        cache_key: String,
        file_path: String,
        duration: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
    },

    /// 上传失败
    #[serde(rename = "narrator:upload-error", rename_all = "camelCase")]
    UploadError {
        #[serde(default)]
        cache_key: Option<String>,
        error: String,
    },
}

/// 编码一帧
pub fn encode_frame<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

/// 解码一帧
pub fn decode_frame<T: for<'de> Deserialize<'de>>(frame: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(frame).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

/// 字节 -> `data:<mime>;base64,<payload>`
pub fn to_data_url(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(data)
    )
}

/// 解码 data URL（只取逗号之后的 base64 部分）
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, ProtocolError> {
    let payload = match data_url.find(',') {
        Some(idx) => &data_url[idx + 1..],
        None => data_url,
    };
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ProtocolError::InvalidDataUrl(e.to_string()))
}
