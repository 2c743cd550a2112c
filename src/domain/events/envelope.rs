//! 事件信封

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::payloads::{
    BookArchived, BookBorrowed, BookCreated, BookReturned, EventPayload, ReaderClosed,
    ReaderCreated, ReportCreate,
};

/// 事件解码错误
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("Malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unexpected event kind: expected {expected}, got {actual}")]
    KindMismatch {
        expected: &'static str,
        actual: String,
    },
}

/// 带类型载荷的事件信封
///
/// 创建后不可变；载荷字段平铺到同一 JSON 对象中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<P> {
    pub event_id: Uuid,
    pub event_type: String,
    pub producer: String,
    pub occurred_on: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: P,
}

impl<P: EventPayload> EventEnvelope<P> {
    pub fn new(payload: P) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: P::KIND.to_string(),
            producer: P::PRODUCER.to_string(),
            occurred_on: Utc::now(),
            payload,
        }
    }

    /// 按声明的 kind 解码；kind 不符视为错误
    pub fn decode(body: &[u8]) -> Result<Self, EventDecodeError> {
        let envelope: Self = serde_json::from_slice(body)?;
        if envelope.event_type != P::KIND {
            return Err(EventDecodeError::KindMismatch {
                expected: P::KIND,
                actual: envelope.event_type,
            });
        }
        Ok(envelope)
    }
}

/// 所有可发布的领域事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    BookCreated(EventEnvelope<BookCreated>),
    BookArchived(EventEnvelope<BookArchived>),
    BookBorrowed(EventEnvelope<BookBorrowed>),
    BookReturned(EventEnvelope<BookReturned>),
    ReaderCreated(EventEnvelope<ReaderCreated>),
    ReaderClosed(EventEnvelope<ReaderClosed>),
    ReportCreate(EventEnvelope<ReportCreate>),
}

macro_rules! domain_event_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for DomainEvent {
                fn from(payload: $variant) -> Self {
                    DomainEvent::$variant(EventEnvelope::new(payload))
                }
            }
        )*
    };
}

domain_event_from!(
    BookCreated,
    BookArchived,
    BookBorrowed,
    BookReturned,
    ReaderCreated,
    ReaderClosed,
    ReportCreate,
);

impl DomainEvent {
    /// kind 标签（同时是目标队列名）
    pub fn kind(&self) -> &str {
        match self {
            DomainEvent::BookCreated(e) => &e.event_type,
            DomainEvent::BookArchived(e) => &e.event_type,
            DomainEvent::BookBorrowed(e) => &e.event_type,
            DomainEvent::BookReturned(e) => &e.event_type,
            DomainEvent::ReaderCreated(e) => &e.event_type,
            DomainEvent::ReaderClosed(e) => &e.event_type,
            DomainEvent::ReportCreate(e) => &e.event_type,
        }
    }

    pub fn event_id(&self) -> Uuid {
        match self {
            DomainEvent::BookCreated(e) => e.event_id,
            DomainEvent::BookArchived(e) => e.event_id,
            DomainEvent::BookBorrowed(e) => e.event_id,
            DomainEvent::BookReturned(e) => e.event_id,
            DomainEvent::ReaderCreated(e) => e.event_id,
            DomainEvent::ReaderClosed(e) => e.event_id,
            DomainEvent::ReportCreate(e) => e.event_id,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
