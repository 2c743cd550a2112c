//! Queue Dispatcher - 单队列订阅
//!
//! 状态机: Stopped → Starting → Consuming → Stopping → Stopped
//!
//! broker 在交给 handler 之前即移除消息，处理语义为至多一次；
//! 解码失败或 handler 出错只记录日志，消息视为已消费

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::application::consumers::EventHandler;
use crate::domain::events::{EventEnvelope, EventPayload};
use crate::infrastructure::broker::{
    BrokerError, Channel, Delivery, DeliveryHandler, SharedConnection,
};

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Stopped,
    Starting,
    Consuming,
    Stopping,
}

impl DispatcherState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatcherState::Stopped => "stopped",
            DispatcherState::Starting => "starting",
            DispatcherState::Consuming => "consuming",
            DispatcherState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 调度器错误
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatcher for {kind} is already {state}")]
    AlreadyStarted {
        kind: &'static str,
        state: DispatcherState,
    },

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Dispatcher start cancelled")]
    Cancelled,
}

/// 可由 supervisor 统一管理的调度器
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// 绑定的事件 kind
    fn event_kind(&self) -> &'static str;

    /// 订阅队列；只有 Stopped 状态可以启动
    async fn start(&self, queue: &str, cancel: &CancellationToken) -> Result<(), DispatchError>;

    /// 取消订阅并等待正在执行的 handler；Stopped 时为空操作
    async fn stop(&self) -> Result<(), DispatchError>;

    async fn state(&self) -> DispatcherState;
}

enum Inner {
    Stopped,
    Starting,
    Consuming {
        channel: Channel,
        consumer_tag: String,
        queue: String,
    },
    Stopping,
}

impl Inner {
    fn state(&self) -> DispatcherState {
        match self {
            Inner::Stopped => DispatcherState::Stopped,
            Inner::Starting => DispatcherState::Starting,
            Inner::Consuming { .. } => DispatcherState::Consuming,
            Inner::Stopping => DispatcherState::Stopping,
        }
    }
}

/// 把原始投递解码为 `H::Payload` 的信封再交给 handler
struct TypedDelivery<H> {
    handler: Arc<H>,
}

#[async_trait]
impl<H: EventHandler> DeliveryHandler for TypedDelivery<H> {
    async fn handle(&self, delivery: Delivery) {
        let kind = <H::Payload as EventPayload>::KIND;
        let event = match EventEnvelope::<H::Payload>::decode(&delivery.body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    queue = %delivery.queue,
                    delivery_tag = delivery.delivery_tag,
                    expected = kind,
                    error = %e,
                    "Dropping undecodable event"
                );
                return;
            }
        };

        let event_id = event.event_id;
        match self.handler.handle(event).await {
            Ok(()) => tracing::debug!(
                queue = %delivery.queue,
                event_id = %event_id,
                "Event handled"
            ),
            Err(e) => tracing::error!(
                queue = %delivery.queue,
                event_id = %event_id,
                error = %e,
                "Event handler failed"
            ),
        }
    }
}

/// 单队列调度器
pub struct QueueDispatcher<H> {
    connection: Arc<SharedConnection>,
    handler: Arc<H>,
    inner: Mutex<Inner>,
}

impl<H: EventHandler> QueueDispatcher<H> {
    pub fn new(connection: Arc<SharedConnection>, handler: H) -> Self {
        Self {
            connection,
            handler: Arc::new(handler),
            inner: Mutex::new(Inner::Stopped),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    async fn subscribe(
        &self,
        queue: &str,
        cancel: &CancellationToken,
    ) -> Result<(Channel, String), DispatchError> {
        let connection = self.connection.get(cancel).await.map_err(|e| match e {
            BrokerError::Cancelled => DispatchError::Cancelled,
            other => DispatchError::Broker(other),
        })?;
        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let channel = connection.create_channel();
        channel.queue_declare(queue)?;
        let consumer_tag = channel.basic_consume(
            queue,
            Arc::new(TypedDelivery {
                handler: self.handler.clone(),
            }),
        )?;
        Ok((channel, consumer_tag))
    }
}

#[async_trait]
impl<H: EventHandler> Dispatcher for QueueDispatcher<H> {
    fn event_kind(&self) -> &'static str {
        <H::Payload as EventPayload>::KIND
    }

    async fn start(&self, queue: &str, cancel: &CancellationToken) -> Result<(), DispatchError> {
        {
            let mut inner = self.inner.lock().await;
            if !matches!(*inner, Inner::Stopped) {
                return Err(DispatchError::AlreadyStarted {
                    kind: self.event_kind(),
                    state: inner.state(),
                });
            }
            *inner = Inner::Starting;
        }

        match self.subscribe(queue, cancel).await {
            Ok((channel, consumer_tag)) => {
                tracing::info!(queue, consumer_tag = %consumer_tag, "Dispatcher consuming");
                *self.inner.lock().await = Inner::Consuming {
                    channel,
                    consumer_tag,
                    queue: queue.to_string(),
                };
                Ok(())
            }
            Err(e) => {
                *self.inner.lock().await = Inner::Stopped;
                Err(e)
            }
        }
    }

    async fn stop(&self) -> Result<(), DispatchError> {
        let (channel, consumer_tag, queue) = {
            let mut inner = self.inner.lock().await;
            match std::mem::replace(&mut *inner, Inner::Stopping) {
                Inner::Consuming {
                    channel,
                    consumer_tag,
                    queue,
                } => (channel, consumer_tag, queue),
                other => {
                    *inner = other;
                    return Ok(());
                }
            }
        };

        let result = channel.basic_cancel(&consumer_tag).await;
        channel.close().await;
        *self.inner.lock().await = Inner::Stopped;

        tracing::info!(queue = %queue, consumer_tag = %consumer_tag, "Dispatcher stopped");
        result.map_err(DispatchError::from)
    }

    async fn state(&self) -> DispatcherState {
        self.inner.lock().await.state()
    }
}
