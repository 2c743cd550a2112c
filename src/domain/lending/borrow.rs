//! Lending Context - Borrow 实体

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BorrowError;

/// 借期（天）
pub const LOAN_PERIOD_DAYS: u64 = 30;

/// 借阅状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BorrowStatus {
    /// 借出中
    Issued,
    /// 按期归还
    Returned,
    /// 逾期归还
    Overdue,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Issued => "issued",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Overdue => "overdue",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "issued" => Some(BorrowStatus::Issued),
            "returned" => Some(BorrowStatus::Returned),
            "overdue" => Some(BorrowStatus::Overdue),
            _ => None,
        }
    }
}

/// 借阅记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Borrow {
    pub id: Uuid,
    pub book_id: Uuid,
    pub reader_id: Uuid,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: BorrowStatus,
}

impl Borrow {
    /// 新建借阅（Issued，到期日 = 借出日 + 30 天）
    pub fn issue(book_id: Uuid, reader_id: Uuid, today: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            reader_id,
            borrow_date: today,
            due_date: today + Days::new(LOAN_PERIOD_DAYS),
            return_date: None,
            status: BorrowStatus::Issued,
        }
    }

    pub fn is_issued(&self) -> bool {
        self.status == BorrowStatus::Issued
    }

    /// 归还；到期前归还为 Returned，否则为 Overdue
    pub fn return_book(&mut self, today: NaiveDate) -> Result<(), BorrowError> {
        if !self.is_issued() {
            return Err(BorrowError::AlreadyReturned);
        }
        self.return_date = Some(today);
        self.status = if today < self.due_date {
            BorrowStatus::Returned
        } else {
            BorrowStatus::Overdue
        };
        Ok(())
    }
}
