//! Reporting Context - 活动日志记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::EventType;

/// 报表文件表头
pub const REPORT_HEADER: &str = "EventType;EventDate;Metadata";

/// 活动日志（只追加）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogRecord {
    pub id: Uuid,
    pub external_book_id: Option<Uuid>,
    pub external_reader_id: Option<Uuid>,
    pub event_type: EventType,
    /// 事件自身的 occurredOn，而非到达时间
    pub event_date: DateTime<Utc>,
    /// 原始事件 JSON
    pub metadata: String,
}

/// 渲染报表文本（`;` 分隔，每条日志一行）
pub fn render_activity_report(logs: &[ActivityLogRecord]) -> String {
    let mut out = String::with_capacity(REPORT_HEADER.len() + 1 + logs.len() * 128);
    out.push_str(REPORT_HEADER);
    out.push('\n');
    for log in logs {
        out.push_str(log.event_type.as_str());
        out.push(';');
        out.push_str(&log.event_date.to_rfc3339());
        out.push(';');
        out.push_str(&quote_field(&log.metadata));
        out.push('\n');
    }
    out
}

fn quote_field(value: &str) -> String {
    if value.contains([';', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_quotes_metadata() {
        let log = ActivityLogRecord {
            id: Uuid::new_v4(),
            external_book_id: None,
            external_reader_id: None,
            event_type: EventType::BookBorrowed,
            event_date: Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap(),
            metadata: r#"{"title":"A;B"}"#.to_string(),
        };

        let text = render_activity_report(&[log]);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(REPORT_HEADER));
        assert_eq!(
            lines.next(),
            Some(r#"book.borrowed;2025-01-05T10:00:00+00:00;"{""title"":""A;B""}""#)
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_activity_report(&[]), format!("{}\n", REPORT_HEADER));
    }
}
