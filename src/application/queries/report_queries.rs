//! Report Queries

use chrono::NaiveDate;
use uuid::Uuid;

use crate::application::ports::Page;
use crate::domain::events::EventType;

/// 所有报表（含生成失败的）
#[derive(Debug, Clone, Default)]
pub struct GetReports;

/// 已生成报表的下载地址
#[derive(Debug, Clone)]
pub struct GetReportFileUrl {
    pub report_id: Uuid,
}

/// 活动日志（直接查询存储，不走缓存）
#[derive(Debug, Clone)]
pub struct GetActivityLogs {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub event_type: Option<EventType>,
    pub page: Page,
}
