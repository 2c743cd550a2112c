//! 活动事件类型
//!
//! 活动日志统一使用该枚举；与线上 kind 字符串一一对应，数值用于 report.create 的 eventTypeId

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "book.created")]
    BookCreated,
    #[serde(rename = "book.archived")]
    BookArchived,
    #[serde(rename = "book.borrowed")]
    BookBorrowed,
    #[serde(rename = "book.returned")]
    BookReturned,
    #[serde(rename = "reader.created")]
    ReaderCreated,
    #[serde(rename = "reader.closed")]
    ReaderClosed,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::BookCreated,
        EventType::BookArchived,
        EventType::BookBorrowed,
        EventType::BookReturned,
        EventType::ReaderCreated,
        EventType::ReaderClosed,
    ];

    /// 线上 kind（同时是队列名）
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::BookCreated => "book.created",
            EventType::BookArchived => "book.archived",
            EventType::BookBorrowed => "book.borrowed",
            EventType::BookReturned => "book.returned",
            EventType::ReaderCreated => "reader.created",
            EventType::ReaderClosed => "reader.closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn id(&self) -> i32 {
        match self {
            EventType::BookCreated => 1,
            EventType::BookArchived => 2,
            EventType::BookBorrowed => 3,
            EventType::BookReturned => 4,
            EventType::ReaderCreated => 5,
            EventType::ReaderClosed => 6,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_mapping() {
        for t in EventType::ALL {
            assert_eq!(EventType::from_str(t.as_str()), Some(t));
            assert_eq!(EventType::from_id(t.id()), Some(t));
            assert_eq!(serde_json::to_value(t).unwrap(), t.as_str());
        }
        assert_eq!(EventType::from_id(0), None);
        assert_eq!(EventType::from_str("report.create"), None);
    }
}
