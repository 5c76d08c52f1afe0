//! In-Process Channel - 基于 broadcast 的双向消息通道
//!
//! `pair()` 返回相互连接的两端：一端发出的帧只有另一端的订阅者能收到

use tokio::sync::broadcast;

use crate::application::ports::{ChannelError, MessageChannel};

/// 默认缓冲帧数
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// 进程内消息通道的一端
#[derive(Clone)]
pub struct InProcessChannel {
    outbound: broadcast::Sender<String>,
    inbound: broadcast::Sender<String>,
}

impl InProcessChannel {
    /// 创建一对相互连接的通道
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_to_b, _) = broadcast::channel(capacity);
        let (b_to_a, _) = broadcast::channel(capacity);

        let a = Self {
            outbound: a_to_b.clone(),
            inbound: b_to_a.clone(),
        };
        let b = Self {
            outbound: b_to_a,
            inbound: a_to_b,
        };
        (a, b)
    }
}

impl MessageChannel for InProcessChannel {
    fn send(&self, frame: String) -> Result<(), ChannelError> {
        self.outbound
            .send(frame)
            .map(|_| ())
            .map_err(|_| ChannelError::NoReceiver)
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inbound.subscribe()
    }
}
