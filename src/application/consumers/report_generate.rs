//! report.create 消费者

use async_trait::async_trait;
use std::sync::Arc;

use super::EventHandler;
use crate::application::commands::handlers::ReportGenerator;
use crate::application::commands::GenerateReport;
use crate::application::error::ApplicationError;
use crate::domain::events::{EventEnvelope, EventType, ReportCreate};

pub struct ReportGenerateHandler {
    generator: Arc<ReportGenerator>,
}

impl ReportGenerateHandler {
    pub fn new(generator: Arc<ReportGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl EventHandler for ReportGenerateHandler {
    type Payload = ReportCreate;

    async fn handle(&self, event: EventEnvelope<ReportCreate>) -> Result<(), ApplicationError> {
        let payload = event.payload;
        let event_type = EventType::from_id(payload.event_type_id).ok_or_else(|| {
            ApplicationError::validation(format!("Unknown event type id {}", payload.event_type_id))
        })?;

        self.generator
            .generate(GenerateReport {
                report_id: payload.report_id,
                period_from: payload.period_from,
                period_to: payload.period_to,
                event_type,
            })
            .await?;
        Ok(())
    }
}
