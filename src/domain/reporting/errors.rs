//! Reporting Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Report period start cannot be later than its end")]
    InvalidPeriod,

    #[error("Report name cannot be empty")]
    EmptyName,

    #[error("Report is not generated yet")]
    NotGenerated,
}
