//! Reporting Context - Report 实体

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReportError;
use crate::domain::events::EventType;

/// 报表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStatus {
    /// 生成中
    InProgress,
    /// 已生成
    Generated,
    /// 生成失败
    Error,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Generated => "generated",
            ReportStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(ReportStatus::InProgress),
            "generated" => Some(ReportStatus::Generated),
            "error" => Some(ReportStatus::Error),
            _ => None,
        }
    }
}

/// 报表
///
/// 生命周期: InProgress -> Generated | Error；名称创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub name: String,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub event_type: EventType,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub generated_at: Option<DateTime<Utc>>,
    pub file_path: Option<String>,
}

impl Report {
    /// 创建 InProgress 状态的报表
    pub fn request(
        name: impl Into<String>,
        period_from: NaiveDate,
        period_to: NaiveDate,
        event_type: EventType,
    ) -> Result<Self, ReportError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ReportError::EmptyName);
        }
        if period_to < period_from {
            return Err(ReportError::InvalidPeriod);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            period_from,
            period_to,
            event_type,
            status: ReportStatus::InProgress,
            created_at: Utc::now(),
            generated_at: None,
            file_path: None,
        })
    }

    pub fn mark_generated(&mut self, file_path: impl Into<String>) {
        self.file_path = Some(file_path.into());
        self.generated_at = Some(Utc::now());
        self.status = ReportStatus::Generated;
    }

    pub fn mark_failed(&mut self) {
        self.status = ReportStatus::Error;
    }

    /// 已生成报表的文件路径
    pub fn generated_file(&self) -> Result<&str, ReportError> {
        match (&self.status, &self.file_path) {
            (ReportStatus::Generated, Some(path)) => Ok(path),
            _ => Err(ReportError::NotGenerated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_request_validates_period() {
        let result = Report::request("jan", date(2025, 2, 1), date(2025, 1, 1), EventType::BookBorrowed);
        assert_eq!(result.unwrap_err(), ReportError::InvalidPeriod);
    }

    #[test]
    fn test_lifecycle() {
        let mut report =
            Report::request("jan", date(2025, 1, 1), date(2025, 1, 31), EventType::BookBorrowed).unwrap();
        assert_eq!(report.status, ReportStatus::InProgress);
        assert_eq!(report.generated_file().unwrap_err(), ReportError::NotGenerated);

        report.mark_generated("2025/1/x.csv");
        assert_eq!(report.status, ReportStatus::Generated);
        assert!(report.generated_at.is_some());
        assert_eq!(report.generated_file().unwrap(), "2025/1/x.csv");
    }
}
