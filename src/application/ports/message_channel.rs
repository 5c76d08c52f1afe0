//! Message Channel Port - 单连接双向消息通道
//!
//! 基于 topic 的发布/订阅，帧为 JSON 文本

use thiserror::Error;
use tokio::sync::broadcast;

/// 通道错误
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("No receiver on the other end of the channel")]
    NoReceiver,
}

/// Message Channel Port
pub trait MessageChannel: Send + Sync {
    /// 发送一帧
    fn send(&self, frame: String) -> Result<(), ChannelError>;

    /// 订阅对端发来的帧
    ///
    /// 只能收到订阅之后发送的帧
    fn subscribe(&self) -> broadcast::Receiver<String>;
}
