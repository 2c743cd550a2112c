//! Reader Commands

use chrono::NaiveDate;
use uuid::Uuid;

/// 办理读者卡
#[derive(Debug, Clone)]
pub struct CreateReader {
    pub full_name: String,
    pub phone_number: String,
    pub expiry_date: NaiveDate,
}

/// 读者卡续期
#[derive(Debug, Clone)]
pub struct ExtendReader {
    pub reader_id: Uuid,
    pub new_expiry_date: NaiveDate,
}

/// 注销读者卡
#[derive(Debug, Clone)]
pub struct CloseReader {
    pub reader_id: Uuid,
}
