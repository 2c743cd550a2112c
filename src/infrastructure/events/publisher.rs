//! Event Publisher Implementation
//!
//! 通过 broker 发布领域事件：每次发布打开一个 channel，
//! 声明以事件 kind 命名的队列，以持久消息发送自描述 JSON，然后关闭 channel

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EventPublisherPort, PublishError};
use crate::domain::events::DomainEvent;
use crate::infrastructure::broker::{BrokerError, SharedConnection};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Broker 事件发布器
pub struct BrokerEventPublisher {
    connection: Arc<SharedConnection>,
    cancel: CancellationToken,
}

impl BrokerEventPublisher {
    pub fn new(connection: Arc<SharedConnection>, cancel: CancellationToken) -> Self {
        Self { connection, cancel }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl From<BrokerError> for PublishError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Cancelled => PublishError::Cancelled,
            other => PublishError::Broker(other.to_string()),
        }
    }
}

#[async_trait]
impl EventPublisherPort for BrokerEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        let body = event.to_json()?;
        let queue = event.kind();

        let connection = self.connection.get(&self.cancel).await?;
        let channel = connection.create_channel();

        let result = async {
            channel.queue_declare(queue)?;
            channel
                .basic_publish(queue, body, CONTENT_TYPE_JSON, true)
                .await
        }
        .await;
        channel.close().await;

        let delivery_tag = result?;
        tracing::info!(
            event_id = %event.event_id(),
            event_type = queue,
            delivery_tag,
            "Domain event published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{BookArchived, EventEnvelope};
    use crate::infrastructure::broker::BrokerConnection;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_lands_in_kind_queue() {
        let connection = Arc::new(BrokerConnection::temporary().unwrap());
        let shared = Arc::new(SharedConnection::from_connection(connection.clone()));
        let publisher = BrokerEventPublisher::new(shared, CancellationToken::new());

        let payload = BookArchived {
            book_id: Uuid::new_v4(),
            title: "Solaris".to_string(),
            archived_at: Utc::now(),
        };
        let event = DomainEvent::from(payload.clone());
        publisher.publish(event.clone()).await.unwrap();

        assert_eq!(connection.queue_len("book.archived").unwrap(), 1);
        assert_eq!(connection.queue_len("book.created").unwrap(), 0);

        // 队列中的消息可按声明的 kind 解码
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        struct Forward(tokio::sync::mpsc::UnboundedSender<Vec<u8>>);
        #[async_trait]
        impl crate::infrastructure::broker::DeliveryHandler for Forward {
            async fn handle(&self, delivery: crate::infrastructure::broker::Delivery) {
                let _ = self.0.send(delivery.body);
            }
        }
        let channel = connection.create_channel();
        channel.basic_consume("book.archived", Arc::new(Forward(tx))).unwrap();
        let body = rx.recv().await.unwrap();
        channel.close().await;

        let decoded = EventEnvelope::<BookArchived>::decode(&body).unwrap();
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded.event_id, event.event_id());
    }

    #[tokio::test]
    async fn test_cancelled_publisher_fails() {
        let shared = Arc::new(SharedConnection::new(Default::default()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let publisher = BrokerEventPublisher::new(shared, cancel);

        let event = DomainEvent::from(BookArchived {
            book_id: Uuid::new_v4(),
            title: "x".to_string(),
            archived_at: Utc::now(),
        });
        assert!(matches!(publisher.publish(event).await, Err(PublishError::Cancelled)));
    }
}
