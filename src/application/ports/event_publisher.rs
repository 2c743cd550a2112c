//! Event Publisher Port - 领域事件发布
//!
//! 发布返回即表示 broker 已接收（不代表已被消费）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::events::DomainEvent;

/// 发布错误
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Publish cancelled")]
    Cancelled,
}

/// Event Publisher Port
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// 发布事件到以其 kind 命名的持久队列
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError>;
}
