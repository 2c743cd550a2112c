//! Domain Events - 领域事件
//!
//! 事件以自描述 JSON 传输：信封字段（eventId / eventType / producer / occurredOn）
//! 与各类型载荷字段平铺在同一对象中。eventType 同时是队列名。

mod envelope;
mod event_type;
mod payloads;

pub use envelope::{DomainEvent, EventDecodeError, EventEnvelope};
pub use event_type::EventType;
pub use payloads::{
    ActivityPayload, BookArchived, BookBorrowed, BookCreated, BookReturned, EventPayload,
    ReaderClosed, ReaderCreated, ReportCreate, LIBRARY_PRODUCER, REPORTS_PRODUCER,
};
