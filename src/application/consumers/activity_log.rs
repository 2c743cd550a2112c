//! 活动日志消费者

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::EventHandler;
use crate::application::error::ApplicationError;
use crate::application::ports::ActivityLogRepositoryPort;
use crate::domain::events::{ActivityPayload, EventEnvelope};
use crate::domain::reporting::ActivityLogRecord;

/// 把一种活动事件追加到活动日志
///
/// event_date 取事件自身的 occurredOn；metadata 为完整事件 JSON
pub struct ActivityLogHandler<P> {
    log_repo: Arc<dyn ActivityLogRepositoryPort>,
    _payload: PhantomData<fn() -> P>,
}

impl<P: ActivityPayload> ActivityLogHandler<P> {
    pub fn new(log_repo: Arc<dyn ActivityLogRepositoryPort>) -> Self {
        Self {
            log_repo,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<P: ActivityPayload> EventHandler for ActivityLogHandler<P> {
    type Payload = P;

    async fn handle(&self, event: EventEnvelope<P>) -> Result<(), ApplicationError> {
        let record = ActivityLogRecord {
            id: Uuid::new_v4(),
            external_book_id: event.payload.book_id(),
            external_reader_id: event.payload.reader_id(),
            event_type: P::EVENT_TYPE,
            event_date: event.occurred_on,
            metadata: serde_json::to_string(&event)?,
        };
        self.log_repo.append(&record).await?;

        tracing::debug!(
            event_id = %event.event_id,
            event_type = P::KIND,
            "Activity logged"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ActivityLogFilter, ActivityLogRepositoryPort};
    use crate::domain::events::{BookBorrowed, EventType, ReaderCreated};
    use crate::infrastructure::memory::InMemoryActivityLogRepository;
    use chrono::{Duration, NaiveDate, Utc};

    #[tokio::test]
    async fn test_borrowed_event_is_logged_with_both_ids() {
        let logs = InMemoryActivityLogRepository::new().arc();
        let handler = ActivityLogHandler::<BookBorrowed>::new(logs.clone());

        let mut event = EventEnvelope::new(BookBorrowed {
            book_id: Uuid::new_v4(),
            reader_id: Uuid::new_v4(),
            title: "Dune".to_string(),
            borrow_date: Utc::now().date_naive(),
            due_date: Utc::now().date_naive(),
        });
        // 到达晚于发生，记录的是发生时间
        event.occurred_on = Utc::now() - Duration::days(2);
        handler.handle(event.clone()).await.unwrap();

        let day = event.occurred_on.date_naive();
        let stored = logs
            .find(&ActivityLogFilter {
                from: day,
                to: day,
                event_type: None,
                page: None,
            })
            .await
            .unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event_type, EventType::BookBorrowed);
        assert_eq!(stored[0].event_date, event.occurred_on);
        assert_eq!(stored[0].external_book_id, Some(event.payload.book_id));
        assert_eq!(stored[0].external_reader_id, Some(event.payload.reader_id));

        let metadata: EventEnvelope<BookBorrowed> = serde_json::from_str(&stored[0].metadata).unwrap();
        assert_eq!(metadata, event);
    }

    #[tokio::test]
    async fn test_reader_event_has_no_book_id() {
        let logs = InMemoryActivityLogRepository::new().arc();
        let handler = ActivityLogHandler::<ReaderCreated>::new(logs.clone());

        handler
            .handle(EventEnvelope::new(ReaderCreated {
                reader_id: Uuid::new_v4(),
                full_name: "Ada".to_string(),
                phone_number: "+1".to_string(),
                expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            }))
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let stored = logs
            .find(&ActivityLogFilter {
                from: today,
                to: today,
                event_type: Some(EventType::ReaderCreated),
                page: None,
            })
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].external_book_id.is_none());
        assert!(stored[0].external_reader_id.is_some());
    }
}
