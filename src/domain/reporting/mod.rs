//! Reporting Context - 活动日志与报表

mod activity_log;
mod errors;
mod report;

pub use activity_log::{render_activity_report, ActivityLogRecord, REPORT_HEADER};
pub use errors::ReportError;
pub use report::{Report, ReportStatus};
