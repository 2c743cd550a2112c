//! SQLite Report & Activity Log Repositories

use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::database::{
    db_error, format_timestamp, parse_date, parse_optional_uuid, parse_timestamp, parse_uuid,
    unknown_value,
};
use super::DbPool;
use crate::application::ports::{
    ActivityLogFilter, ActivityLogRepositoryPort, ReportRepositoryPort, RepositoryError,
};
use crate::domain::events::EventType;
use crate::domain::reporting::{ActivityLogRecord, Report, ReportStatus};

const REPORT_COLUMNS: &str = "SELECT id, name, period_from, period_to, event_type, status, created_at, generated_at, file_path FROM reports";

fn parse_event_type(value: &str) -> Result<EventType, RepositoryError> {
    EventType::from_str(value).ok_or_else(|| unknown_value("event_type", value))
}

// ============================================================================
// Reports
// ============================================================================

/// SQLite Report Repository
pub struct SqliteReportRepository {
    pool: DbPool,
}

impl SqliteReportRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ReportRow {
    id: String,
    name: String,
    period_from: String,
    period_to: String,
    event_type: String,
    status: String,
    created_at: String,
    generated_at: Option<String>,
    file_path: Option<String>,
}

impl TryFrom<ReportRow> for Report {
    type Error = RepositoryError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Report {
            id: parse_uuid(&row.id)?,
            name: row.name,
            period_from: parse_date(&row.period_from)?,
            period_to: parse_date(&row.period_to)?,
            event_type: parse_event_type(&row.event_type)?,
            status: ReportStatus::from_str(&row.status)
                .ok_or_else(|| unknown_value("status", &row.status))?,
            created_at: parse_timestamp(&row.created_at)?,
            generated_at: row.generated_at.as_deref().map(parse_timestamp).transpose()?,
            file_path: row.file_path,
        })
    }
}

#[async_trait]
impl ReportRepositoryPort for SqliteReportRepository {
    async fn create(&self, report: &Report) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, name, period_from, period_to, event_type, status, created_at, generated_at, file_path)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.id.to_string())
        .bind(&report.name)
        .bind(report.period_from.to_string())
        .bind(report.period_to.to_string())
        .bind(report.event_type.as_str())
        .bind(report.status.as_str())
        .bind(format_timestamp(&report.created_at))
        .bind(report.generated_at.as_ref().map(format_timestamp))
        .bind(&report.file_path)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update(&self, report: &Report) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE reports SET status = ?, generated_at = ?, file_path = ? WHERE id = ?")
            .bind(report.status.as_str())
            .bind(report.generated_at.as_ref().map(format_timestamp))
            .bind(&report.file_path)
            .bind(report.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("report {}", report.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>, RepositoryError> {
        let row: Option<ReportRow> = sqlx::query_as(&format!("{} WHERE id = ?", REPORT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Report::try_from).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Report>, RepositoryError> {
        let row: Option<ReportRow> = sqlx::query_as(&format!("{} WHERE name = ?", REPORT_COLUMNS))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Report::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Report>, RepositoryError> {
        let rows: Vec<ReportRow> = sqlx::query_as(&format!("{} ORDER BY created_at DESC, id", REPORT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter().map(Report::try_from).collect()
    }
}

// ============================================================================
// Activity logs
// ============================================================================

/// SQLite Activity Log Repository（只追加）
pub struct SqliteActivityLogRepository {
    pool: DbPool,
}

impl SqliteActivityLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ActivityLogRow {
    id: String,
    external_book_id: Option<String>,
    external_reader_id: Option<String>,
    event_type: String,
    event_date: String,
    metadata: String,
}

impl TryFrom<ActivityLogRow> for ActivityLogRecord {
    type Error = RepositoryError;

    fn try_from(row: ActivityLogRow) -> Result<Self, Self::Error> {
        Ok(ActivityLogRecord {
            id: parse_uuid(&row.id)?,
            external_book_id: parse_optional_uuid(row.external_book_id)?,
            external_reader_id: parse_optional_uuid(row.external_reader_id)?,
            event_type: parse_event_type(&row.event_type)?,
            event_date: parse_timestamp(&row.event_date)?,
            metadata: row.metadata,
        })
    }
}

#[async_trait]
impl ActivityLogRepositoryPort for SqliteActivityLogRepository {
    async fn append(&self, record: &ActivityLogRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, external_book_id, external_reader_id, event_type, event_date, metadata)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.external_book_id.map(|id| id.to_string()))
        .bind(record.external_reader_id.map(|id| id.to_string()))
        .bind(record.event_type.as_str())
        .bind(format_timestamp(&record.event_date))
        .bind(&record.metadata)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find(&self, filter: &ActivityLogFilter) -> Result<Vec<ActivityLogRecord>, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, external_book_id, external_reader_id, event_type, event_date, metadata FROM activity_logs WHERE substr(event_date, 1, 10) BETWEEN ",
        );
        query
            .push_bind(filter.from.to_string())
            .push(" AND ")
            .push_bind(filter.to.to_string());
        if let Some(event_type) = filter.event_type {
            query.push(" AND event_type = ").push_bind(event_type.as_str());
        }
        query.push(" ORDER BY event_date, id");
        if let Some(page) = filter.page {
            query
                .push(" LIMIT ")
                .push_bind(page.limit() as i64)
                .push(" OFFSET ")
                .push_bind(page.offset() as i64);
        }

        let rows: Vec<ActivityLogRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(ActivityLogRecord::try_from).collect()
    }
}
