//! In-Memory Report and Activity Log Repositories

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{
    ActivityLogFilter, ActivityLogRepositoryPort, ReportRepositoryPort, RepositoryError,
};
use crate::domain::reporting::{ActivityLogRecord, Report};

/// 内存报表仓储（名称唯一）
pub struct InMemoryReportRepository {
    reports: DashMap<Uuid, Report>,
    names: DashMap<String, Uuid>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self {
            reports: DashMap::new(),
            names: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemoryReportRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportRepositoryPort for InMemoryReportRepository {
    async fn create(&self, report: &Report) -> Result<(), RepositoryError> {
        match self.names.entry(report.name.clone()) {
            Entry::Occupied(_) => {
                return Err(RepositoryError::Duplicate(format!("report {}", report.name)));
            }
            Entry::Vacant(slot) => {
                slot.insert(report.id);
            }
        }
        self.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn update(&self, report: &Report) -> Result<(), RepositoryError> {
        let mut stored = self
            .reports
            .get_mut(&report.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("report {}", report.id)))?;
        *stored = report.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>, RepositoryError> {
        Ok(self.reports.get(&id).map(|r| r.clone()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Report>, RepositoryError> {
        let Some(id) = self.names.get(name).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.reports.get(&id).map(|r| r.clone()))
    }

    async fn list_all(&self) -> Result<Vec<Report>, RepositoryError> {
        let mut reports: Vec<Report> = self.reports.iter().map(|r| r.value().clone()).collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(reports)
    }
}

/// 内存活动日志仓储
pub struct InMemoryActivityLogRepository {
    records: DashMap<Uuid, ActivityLogRecord>,
}

impl InMemoryActivityLogRepository {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryActivityLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityLogRepositoryPort for InMemoryActivityLogRepository {
    async fn append(&self, record: &ActivityLogRecord) -> Result<(), RepositoryError> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(RepositoryError::Duplicate(format!("activity log {}", record.id))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn find(&self, filter: &ActivityLogFilter) -> Result<Vec<ActivityLogRecord>, RepositoryError> {
        let mut records: Vec<ActivityLogRecord> = self
            .records
            .iter()
            .filter(|entry| {
                let day = entry.event_date.date_naive();
                day >= filter.from
                    && day <= filter.to
                    && filter.event_type.map_or(true, |t| entry.event_type == t)
            })
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.event_date.cmp(&b.event_date).then(a.id.cmp(&b.id)));

        Ok(match filter.page {
            Some(page) => records.into_iter().skip(page.offset()).take(page.limit()).collect(),
            None => records,
        })
    }
}
