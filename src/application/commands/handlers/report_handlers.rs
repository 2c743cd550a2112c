//! Report Command Handlers
//!
//! CreateReport 只登记 InProgress 报表并发布 report.create，
//! 文件由消费者通过 `ReportGenerator` 异步生成

use chrono::{Datelike, Utc};
use std::sync::Arc;

use crate::application::cache::{keys, CacheGateway};
use crate::application::commands::{CreateReport, GenerateReport};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ActivityLogFilter, ActivityLogRepositoryPort, BlobStorePort, EventPublisherPort,
    ReportRepositoryPort, RepositoryError,
};
use crate::domain::events::ReportCreate;
use crate::domain::reporting::{render_activity_report, Report, ReportStatus};

const SERVICE: &str = "report-service";
const REPORT_CONTENT_TYPE: &str = "text/csv";

fn name_taken(name: &str) -> ApplicationError {
    ApplicationError::business_rule(format!("Report {:?} already exists", name))
}

// ============================================================================
// CreateReport
// ============================================================================

/// CreateReport Handler
pub struct CreateReportHandler {
    report_repo: Arc<dyn ReportRepositoryPort>,
    cache: CacheGateway,
    publisher: Arc<dyn EventPublisherPort>,
}

impl CreateReportHandler {
    pub fn new(
        report_repo: Arc<dyn ReportRepositoryPort>,
        cache: CacheGateway,
        publisher: Arc<dyn EventPublisherPort>,
    ) -> Self {
        Self {
            report_repo,
            cache,
            publisher,
        }
    }

    pub async fn handle(&self, command: CreateReport) -> Result<Report, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to create report"))
    }

    async fn execute(&self, command: CreateReport) -> Result<Report, ApplicationError> {
        let report = Report::request(
            command.name,
            command.period_from,
            command.period_to,
            command.event_type,
        )?;

        if self.report_repo.find_by_name(&report.name).await?.is_some() {
            return Err(name_taken(&report.name));
        }
        match self.report_repo.create(&report).await {
            Ok(()) => {}
            Err(RepositoryError::Duplicate(_)) => return Err(name_taken(&report.name)),
            Err(e) => return Err(e.into()),
        }

        self.cache.remove(keys::REPORTS_LIST_KEY).await;

        self.publisher
            .publish(
                ReportCreate {
                    report_id: report.id,
                    period_from: report.period_from,
                    period_to: report.period_to,
                    event_type_id: report.event_type.id(),
                }
                .into(),
            )
            .await?;

        tracing::info!(
            report_id = %report.id,
            event_type = report.event_type.as_str(),
            period_from = %report.period_from,
            period_to = %report.period_to,
            "Report requested"
        );
        Ok(report)
    }
}

// ============================================================================
// ReportGenerator
// ============================================================================

/// 报表生成器
///
/// 成功: 上传 `{year}/{month}/{reportId}.csv` → Generated
/// 失败: 标记 Error 后返回原始错误；两种情况都会删除 `reports:list`
pub struct ReportGenerator {
    report_repo: Arc<dyn ReportRepositoryPort>,
    log_repo: Arc<dyn ActivityLogRepositoryPort>,
    blob_store: Arc<dyn BlobStorePort>,
    cache: CacheGateway,
}

impl ReportGenerator {
    pub fn new(
        report_repo: Arc<dyn ReportRepositoryPort>,
        log_repo: Arc<dyn ActivityLogRepositoryPort>,
        blob_store: Arc<dyn BlobStorePort>,
        cache: CacheGateway,
    ) -> Self {
        Self {
            report_repo,
            log_repo,
            blob_store,
            cache,
        }
    }

    pub async fn generate(&self, command: GenerateReport) -> Result<Report, ApplicationError> {
        let mut report = self
            .report_repo
            .find_by_id(command.report_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Report", command.report_id))?;

        if report.status != ReportStatus::InProgress {
            return Err(ApplicationError::invalid_state(format!(
                "Report {} is already {}",
                report.id,
                report.status.as_str()
            )));
        }

        let outcome = self.render_and_upload(&command).await;
        match &outcome {
            Ok(path) => report.mark_generated(path.clone()),
            Err(_) => report.mark_failed(),
        }

        let persisted = self.report_repo.update(&report).await;
        self.cache.remove(keys::REPORTS_LIST_KEY).await;

        match outcome {
            Ok(path) => {
                persisted?;
                tracing::info!(report_id = %report.id, path = %path, "Report generated");
                Ok(report)
            }
            Err(e) => {
                if let Err(update_err) = persisted {
                    tracing::error!(
                        report_id = %report.id,
                        error = %update_err,
                        "Failed to persist report error status"
                    );
                }
                tracing::error!(report_id = %report.id, error = %e, "Report generation failed");
                Err(e)
            }
        }
    }

    async fn render_and_upload(&self, command: &GenerateReport) -> Result<String, ApplicationError> {
        let logs = self
            .log_repo
            .find(&ActivityLogFilter {
                from: command.period_from,
                to: command.period_to,
                event_type: Some(command.event_type),
                page: None,
            })
            .await?;

        let now = Utc::now();
        let path = format!("{}/{}/{}.csv", now.year(), now.month(), command.report_id);
        let body = render_activity_report(&logs).into_bytes();

        self.blob_store.upload(&path, body, REPORT_CONTENT_TYPE).await?;
        tracing::debug!(report_id = %command.report_id, rows = logs.len(), "Report file uploaded");
        Ok(path)
    }
}
