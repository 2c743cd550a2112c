//! Broker channel - 单次操作的轻量会话

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use sled::Tree;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{BrokerConnection, BrokerError};

/// 队列中存储的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    message_id: Uuid,
    content_type: String,
    persistent: bool,
    body: Vec<u8>,
    published_at_ms: i64,
}

/// 投递给消费者的消息（已从队列移除）
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub message_id: Uuid,
    pub queue: String,
    pub body: Vec<u8>,
}

/// 消息处理回调
#[async_trait]
pub trait DeliveryHandler: Send + Sync + 'static {
    async fn handle(&self, delivery: Delivery);
}

struct ConsumerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Broker channel
pub struct Channel {
    id: u64,
    connection: Arc<BrokerConnection>,
    consumers: DashMap<String, ConsumerHandle>,
    next_consumer: AtomicU64,
    closed: AtomicBool,
}

impl Channel {
    pub(super) fn new(id: u64, connection: Arc<BrokerConnection>) -> Self {
        Self {
            id,
            connection,
            consumers: DashMap::new(),
            next_consumer: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::ChannelClosed(self.id));
        }
        Ok(())
    }

    /// 声明队列（幂等）
    pub fn queue_declare(&self, queue: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.connection.queue_tree(queue)?;
        Ok(())
    }

    /// 发布消息，返回 broker 接收后的投递序号
    ///
    /// 持久消息在返回前刷盘（除非连接配置关闭了刷盘）
    pub async fn basic_publish(
        &self,
        queue: &str,
        body: Vec<u8>,
        content_type: &str,
        persistent: bool,
    ) -> Result<u64, BrokerError> {
        self.ensure_open()?;
        let tree = self.connection.queue_tree(queue)?;
        let delivery_tag = self.connection.next_message_id()?;

        let message = StoredMessage {
            message_id: Uuid::new_v4(),
            content_type: content_type.to_string(),
            persistent,
            body,
            published_at_ms: Utc::now().timestamp_millis(),
        };
        tree.insert(delivery_tag.to_be_bytes(), bincode::serialize(&message)?)?;

        if persistent && self.connection.flush_on_publish() {
            tree.flush_async().await?;
        }

        self.connection.signal(queue).notify_waiters();

        tracing::debug!(
            queue,
            delivery_tag,
            message_id = %message.message_id,
            "Message published"
        );
        Ok(delivery_tag)
    }

    /// 注册消费者，返回 consumer tag
    ///
    /// 消息在交给 handler 之前即从队列移除（收到即确认）
    pub fn basic_consume(
        &self,
        queue: &str,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<String, BrokerError> {
        self.ensure_open()?;
        let tree = self.connection.queue_tree(queue)?;
        let signal = self.connection.signal(queue);

        let tag = format!(
            "ctag-{}.{}",
            self.id,
            self.next_consumer.fetch_add(1, Ordering::Relaxed)
        );
        let token = CancellationToken::new();
        let task = tokio::spawn(consume_loop(
            queue.to_string(),
            tag.clone(),
            tree,
            signal,
            handler,
            token.clone(),
        ));

        self.consumers.insert(tag.clone(), ConsumerHandle { token, task });
        tracing::info!(queue, consumer_tag = %tag, channel = self.id, "Consumer registered");
        Ok(tag)
    }

    /// 取消消费者，等待正在执行的 handler 结束
    pub async fn basic_cancel(&self, consumer_tag: &str) -> Result<(), BrokerError> {
        let (_, handle) = self
            .consumers
            .remove(consumer_tag)
            .ok_or_else(|| BrokerError::UnknownConsumer(consumer_tag.to_string()))?;

        handle.token.cancel();
        if let Err(e) = handle.task.await {
            tracing::error!(consumer_tag, error = %e, "Consumer task ended abnormally");
        }
        tracing::info!(consumer_tag, "Consumer cancelled");
        Ok(())
    }

    /// 关闭 channel，取消所有消费者
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let tags: Vec<String> = self.consumers.iter().map(|e| e.key().clone()).collect();
        for tag in tags {
            let _ = self.basic_cancel(&tag).await;
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        for entry in self.consumers.iter() {
            entry.value().token.cancel();
        }
    }
}

async fn consume_loop(
    queue: String,
    tag: String,
    tree: Tree,
    signal: Arc<Notify>,
    handler: Arc<dyn DeliveryHandler>,
    token: CancellationToken,
) {
    loop {
        if token.is_cancelled() {
            break;
        }

        // 先登记等待再检查队列，避免丢失两者之间的发布通知
        let notified = signal.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let (key, value) = match tree.pop_min() {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = &mut notified => {}
                }
                continue;
            }
            Err(e) => {
                tracing::error!(queue = %queue, consumer_tag = %tag, error = %e, "Failed to read queue");
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
                }
                continue;
            }
        };

        let delivery_tag = <[u8; 8]>::try_from(key.as_ref())
            .map(u64::from_be_bytes)
            .unwrap_or_default();
        let message: StoredMessage = match bincode::deserialize(&value) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(queue = %queue, delivery_tag, error = %e, "Dropping undecodable message");
                continue;
            }
        };

        let handled = AssertUnwindSafe(handler.handle(Delivery {
            delivery_tag,
            message_id: message.message_id,
            queue: queue.clone(),
            body: message.body,
        }))
        .catch_unwind()
        .await;

        // handler panic 时消息同样视为已消费，继续消费后续消息
        if let Err(panic) = handled {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(
                queue = %queue,
                consumer_tag = %tag,
                delivery_tag,
                message_id = %message.message_id,
                reason = %reason,
                "Delivery handler panicked"
            );
        }
    }

    tracing::debug!(queue = %queue, consumer_tag = %tag, "Consumer loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Forward(mpsc::UnboundedSender<Delivery>);

    #[async_trait]
    impl DeliveryHandler for Forward {
        async fn handle(&self, delivery: Delivery) {
            let _ = self.0.send(delivery);
        }
    }

    /// 每条消息处理耗时，用于验证 cancel 等待 handler
    struct Slow(Arc<AtomicU64>);

    #[async_trait]
    impl DeliveryHandler for Slow {
        async fn handle(&self, _delivery: Delivery) {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 第一条消息 panic，之后正常计数
    struct PanicsOnce {
        calls: AtomicU64,
        tx: mpsc::UnboundedSender<Delivery>,
    }

    #[async_trait]
    impl DeliveryHandler for PanicsOnce {
        async fn handle(&self, delivery: Delivery) {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("handler failure");
            }
            let _ = self.tx.send(delivery);
        }
    }

    fn connection() -> Arc<BrokerConnection> {
        Arc::new(BrokerConnection::temporary().unwrap())
    }

    #[tokio::test]
    async fn test_messages_wait_in_queue_until_consumed() {
        let connection = connection();
        let channel = connection.create_channel();
        channel.queue_declare("book.created").unwrap();

        channel.basic_publish("book.created", b"1".to_vec(), "application/json", true).await.unwrap();
        channel.basic_publish("book.created", b"2".to_vec(), "application/json", true).await.unwrap();
        assert_eq!(connection.queue_len("book.created").unwrap(), 2);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let consumer = connection.create_channel();
        let tag = consumer.basic_consume("book.created", Arc::new(Forward(tx))).unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.body, b"1");
        assert_eq!(second.body, b"2");
        assert!(first.delivery_tag < second.delivery_tag);
        assert_eq!(connection.queue_len("book.created").unwrap(), 0);

        consumer.basic_cancel(&tag).await.unwrap();
    }

    #[tokio::test]
    async fn test_consumer_wakes_on_publish() {
        let connection = connection();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let consumer = connection.create_channel();
        consumer.basic_consume("reader.closed", Arc::new(Forward(tx))).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let publisher = connection.create_channel();
        publisher.basic_publish("reader.closed", b"x".to_vec(), "application/json", false).await.unwrap();

        let delivery = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(delivery.queue, "reader.closed");
        consumer.close().await;
    }

    #[tokio::test]
    async fn test_cancel_waits_for_in_flight_handler() {
        let connection = connection();
        let handled = Arc::new(AtomicU64::new(0));
        let channel = connection.create_channel();
        channel.basic_publish("report.create", b"r".to_vec(), "application/json", true).await.unwrap();

        let tag = channel.basic_consume("report.create", Arc::new(Slow(handled.clone()))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        channel.basic_cancel(&tag).await.unwrap();
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert!(matches!(
            channel.basic_cancel(&tag).await,
            Err(BrokerError::UnknownConsumer(_))
        ));
    }

    #[tokio::test]
    async fn test_handler_panic_does_not_stop_consumer() {
        let connection = connection();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = Arc::new(PanicsOnce {
            calls: AtomicU64::new(0),
            tx,
        });
        let channel = connection.create_channel();
        let tag = channel.basic_consume("book.archived", handler.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        channel.basic_publish("book.archived", b"1".to_vec(), "application/json", true).await.unwrap();
        channel.basic_publish("book.archived", b"2".to_vec(), "application/json", true).await.unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(delivered.body, b"2");
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(connection.queue_len("book.archived").unwrap(), 0);

        channel.basic_cancel(&tag).await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_operations() {
        let connection = connection();
        let channel = connection.create_channel();
        channel.close().await;

        let err = channel.basic_publish("q", vec![], "application/json", true).await.unwrap_err();
        assert!(matches!(err, BrokerError::ChannelClosed(_)));
        assert_eq!(connection.queue_len("q").unwrap(), 0);
    }
}
