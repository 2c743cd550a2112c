//! 各事件类型的载荷

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EventType;
use crate::domain::book::BookCategory;
use crate::domain::lending::BorrowStatus;

/// 图书馆服务发布的事件
pub const LIBRARY_PRODUCER: &str = "library-service";

/// 报表服务发布的事件
pub const REPORTS_PRODUCER: &str = "reports-service";

/// 事件载荷
pub trait EventPayload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// kind 标签，同时是队列名
    const KIND: &'static str;

    const PRODUCER: &'static str = LIBRARY_PRODUCER;

    fn book_id(&self) -> Option<Uuid> {
        None
    }

    fn reader_id(&self) -> Option<Uuid> {
        None
    }
}

/// 会写入活动日志的载荷
pub trait ActivityPayload: EventPayload {
    const EVENT_TYPE: EventType;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCreated {
    pub book_id: Uuid,
    pub title: String,
    pub category: BookCategory,
    pub authors: Vec<String>,
    pub year: i32,
}

impl EventPayload for BookCreated {
    const KIND: &'static str = "book.created";

    fn book_id(&self) -> Option<Uuid> {
        Some(self.book_id)
    }
}

impl ActivityPayload for BookCreated {
    const EVENT_TYPE: EventType = EventType::BookCreated;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookArchived {
    pub book_id: Uuid,
    pub title: String,
    pub archived_at: DateTime<Utc>,
}

impl EventPayload for BookArchived {
    const KIND: &'static str = "book.archived";

    fn book_id(&self) -> Option<Uuid> {
        Some(self.book_id)
    }
}

impl ActivityPayload for BookArchived {
    const EVENT_TYPE: EventType = EventType::BookArchived;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookBorrowed {
    pub book_id: Uuid,
    pub reader_id: Uuid,
    pub title: String,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl EventPayload for BookBorrowed {
    const KIND: &'static str = "book.borrowed";

    fn book_id(&self) -> Option<Uuid> {
        Some(self.book_id)
    }

    fn reader_id(&self) -> Option<Uuid> {
        Some(self.reader_id)
    }
}

impl ActivityPayload for BookBorrowed {
    const EVENT_TYPE: EventType = EventType::BookBorrowed;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookReturned {
    pub book_id: Uuid,
    pub reader_id: Uuid,
    pub return_date: NaiveDate,
    pub status: BorrowStatus,
}

impl EventPayload for BookReturned {
    const KIND: &'static str = "book.returned";

    fn book_id(&self) -> Option<Uuid> {
        Some(self.book_id)
    }

    fn reader_id(&self) -> Option<Uuid> {
        Some(self.reader_id)
    }
}

impl ActivityPayload for BookReturned {
    const EVENT_TYPE: EventType = EventType::BookReturned;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderCreated {
    pub reader_id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub expiry_date: NaiveDate,
}

impl EventPayload for ReaderCreated {
    const KIND: &'static str = "reader.created";

    fn reader_id(&self) -> Option<Uuid> {
        Some(self.reader_id)
    }
}

impl ActivityPayload for ReaderCreated {
    const EVENT_TYPE: EventType = EventType::ReaderCreated;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderClosed {
    pub reader_id: Uuid,
    pub full_name: String,
    pub closed_on: NaiveDate,
}

impl EventPayload for ReaderClosed {
    const KIND: &'static str = "reader.closed";

    fn reader_id(&self) -> Option<Uuid> {
        Some(self.reader_id)
    }
}

impl ActivityPayload for ReaderClosed {
    const EVENT_TYPE: EventType = EventType::ReaderClosed;
}

/// 报表生成请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCreate {
    pub report_id: Uuid,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub event_type_id: i32,
}

impl EventPayload for ReportCreate {
    const KIND: &'static str = "report.create";
    const PRODUCER: &'static str = REPORTS_PRODUCER;
}
