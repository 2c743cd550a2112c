//! Report Query Handlers

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::cache::{keys, CacheGateway};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ActivityLogFilter, ActivityLogRepositoryPort, BlobStorePort, ReportRepositoryPort,
};
use crate::application::queries::{GetActivityLogs, GetReportFileUrl, GetReports};
use crate::domain::reporting::{ActivityLogRecord, Report};

const SERVICE: &str = "report-service";

/// 报表下载地址
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFileUrl {
    pub report_id: Uuid,
    pub url: String,
}

/// GetReports Handler
pub struct GetReportsHandler {
    report_repo: Arc<dyn ReportRepositoryPort>,
    cache: CacheGateway,
}

impl GetReportsHandler {
    pub fn new(report_repo: Arc<dyn ReportRepositoryPort>, cache: CacheGateway) -> Self {
        Self { report_repo, cache }
    }

    pub async fn handle(&self, _query: GetReports) -> Result<Vec<Report>, ApplicationError> {
        self.cache
            .get_or_load(keys::REPORTS_LIST_KEY, keys::REPORTS_LIST_TTL, || async {
                Ok::<_, ApplicationError>(self.report_repo.list_all().await?)
            })
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to list reports"))
    }
}

/// GetReportFileUrl Handler
pub struct GetReportFileUrlHandler {
    report_repo: Arc<dyn ReportRepositoryPort>,
    blob_store: Arc<dyn BlobStorePort>,
    url_ttl_minutes: u32,
}

impl GetReportFileUrlHandler {
    pub fn new(
        report_repo: Arc<dyn ReportRepositoryPort>,
        blob_store: Arc<dyn BlobStorePort>,
        url_ttl_minutes: u32,
    ) -> Self {
        Self {
            report_repo,
            blob_store,
            url_ttl_minutes,
        }
    }

    pub async fn handle(&self, query: GetReportFileUrl) -> Result<ReportFileUrl, ApplicationError> {
        self.execute(query)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to get report file url"))
    }

    async fn execute(&self, query: GetReportFileUrl) -> Result<ReportFileUrl, ApplicationError> {
        let report = self
            .report_repo
            .find_by_id(query.report_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Report", query.report_id))?;

        let path = report.generated_file()?;
        let url = self.blob_store.get_url(path, self.url_ttl_minutes).await?;
        Ok(ReportFileUrl {
            report_id: report.id,
            url,
        })
    }
}

/// GetActivityLogs Handler
pub struct GetActivityLogsHandler {
    log_repo: Arc<dyn ActivityLogRepositoryPort>,
}

impl GetActivityLogsHandler {
    pub fn new(log_repo: Arc<dyn ActivityLogRepositoryPort>) -> Self {
        Self { log_repo }
    }

    pub async fn handle(&self, query: GetActivityLogs) -> Result<Vec<ActivityLogRecord>, ApplicationError> {
        if query.to < query.from {
            return Err(ApplicationError::validation(format!(
                "Period end {} is before start {}",
                query.to, query.from
            )));
        }

        let filter = ActivityLogFilter {
            from: query.from,
            to: query.to,
            event_type: query.event_type,
            page: Some(query.page),
        };
        self.log_repo
            .find(&filter)
            .await
            .map_err(|e| ApplicationError::from(e).into_service(SERVICE, "Failed to get activity logs"))
    }
}
