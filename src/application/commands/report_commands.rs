//! Report Commands

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::events::EventType;

/// 申请生成报表（异步）
#[derive(Debug, Clone)]
pub struct CreateReport {
    pub name: String,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub event_type: EventType,
}

/// 生成报表文件（由 report.create 消费者触发）
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub report_id: Uuid,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub event_type: EventType,
}
