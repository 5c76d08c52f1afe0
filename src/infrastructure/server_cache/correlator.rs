//! Correlator - 一次性关联请求
//!
//! 请求按 key 登记等待者，应答与超时先到者生效：
//! - 应答到达：移除该 key 的全部等待者并逐一送达
//! - 超时或调用方放弃等待：`PendingReply` 析构时只移除自己的等待者
//!
//! 两条路径的移除都是幂等的，后到的一方什么都不做。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

struct Waiter<V> {
    id: u64,
    tx: oneshot::Sender<V>,
}

type WaiterTable<V> = DashMap<String, Vec<Waiter<V>>>;

/// 已登记、尚未应答的请求
///
/// 析构时注销自己的等待者，future 被中途丢弃也不会残留登记
pub struct PendingReply<V> {
    key: String,
    id: u64,
    rx: oneshot::Receiver<V>,
    table: Arc<WaiterTable<V>>,
}

impl<V> Drop for PendingReply<V> {
    fn drop(&mut self) {
        remove_waiter(&self.table, &self.key, self.id);
    }
}

/// 关联请求表
pub struct Correlator<V> {
    pending: Arc<WaiterTable<V>>,
    next_id: AtomicU64,
}

impl<V: Clone> Correlator<V> {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// 登记一个等待者
    ///
    /// 必须在发出请求之前登记，否则可能错过应答
    pub fn register(&self, key: &str) -> PendingReply<V> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .entry(key.to_string())
            .or_default()
            .push(Waiter { id, tx });
        PendingReply {
            key: key.to_string(),
            id,
            rx,
            table: self.pending.clone(),
        }
    }

    /// 送达应答，返回被唤醒的等待者数量（没有等待者时为 0）
    pub fn complete(&self, key: &str, value: V) -> usize {
        let Some((_, waiters)) = self.pending.remove(key) else {
            return 0;
        };

        let mut delivered = 0;
        for waiter in waiters {
            if waiter.tx.send(value.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// 等待应答，超时返回 `None`
    pub async fn wait(&self, mut pending: PendingReply<V>, timeout: Duration) -> Option<V> {
        match tokio::time::timeout(timeout, &mut pending.rx).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// 放弃等待（例如请求发送失败）
    pub fn cancel(&self, pending: PendingReply<V>) {
        drop(pending);
    }

    /// 当前等待中的 key 数量
    pub fn pending_keys(&self) -> usize {
        self.pending.len()
    }
}

fn remove_waiter<V>(table: &WaiterTable<V>, key: &str, id: u64) {
    if let Entry::Occupied(mut entry) = table.entry(key.to_string()) {
        entry.get_mut().retain(|w| w.id != id);
        if entry.get().is_empty() {
            entry.remove();
        }
    }
}

impl<V: Clone> Default for Correlator<V> {
    fn default() -> Self {
        Self::new()
    }
}
