//! Reader Context - Aggregate Root

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReaderError;

/// 读者卡
///
/// 不变量:
/// - 仅有效（active 且未过期）的卡可以续期或借书
/// - 已关闭的卡不可再次关闭
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reader {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub expiry_date: NaiveDate,
    pub is_active: bool,
}

impl Reader {
    /// 创建新读者卡（初始为 active）
    pub fn new(
        full_name: impl Into<String>,
        phone_number: impl Into<String>,
        expiry_date: NaiveDate,
    ) -> Result<Self, ReaderError> {
        let full_name = full_name.into();
        let phone_number = phone_number.into();
        if full_name.trim().is_empty() {
            return Err(ReaderError::EmptyName);
        }
        if phone_number.trim().is_empty() {
            return Err(ReaderError::EmptyPhone);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            full_name,
            phone_number,
            expiry_date,
            is_active: true,
        })
    }

    /// 卡片是否可用
    pub fn can_borrow(&self, today: NaiveDate) -> bool {
        self.is_active && self.expiry_date >= today
    }

    /// 续期
    pub fn extend(&mut self, new_expiry_date: NaiveDate, today: NaiveDate) -> Result<(), ReaderError> {
        if new_expiry_date < today {
            return Err(ReaderError::ExpiryInPast);
        }
        if !self.can_borrow(today) {
            return Err(ReaderError::CannotExtend);
        }
        self.expiry_date = new_expiry_date;
        Ok(())
    }

    /// 关闭读者卡，过期日截止到今天
    pub fn close(&mut self, today: NaiveDate) -> Result<(), ReaderError> {
        if !self.is_active {
            return Err(ReaderError::AlreadyClosed);
        }
        self.is_active = false;
        self.expiry_date = today;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extend_active_card() {
        let mut reader = Reader::new("Ada Lovelace", "+100", date(2025, 6, 1)).unwrap();
        reader.extend(date(2026, 6, 1), date(2025, 1, 1)).unwrap();
        assert_eq!(reader.expiry_date, date(2026, 6, 1));
    }

    #[test]
    fn test_extend_expired_card_rejected() {
        let mut reader = Reader::new("Ada Lovelace", "+100", date(2024, 6, 1)).unwrap();
        let result = reader.extend(date(2026, 6, 1), date(2025, 1, 1));
        assert_eq!(result.unwrap_err(), ReaderError::CannotExtend);
    }

    #[test]
    fn test_extend_into_past_rejected() {
        let mut reader = Reader::new("Ada Lovelace", "+100", date(2025, 6, 1)).unwrap();
        let result = reader.extend(date(2024, 12, 31), date(2025, 1, 1));
        assert_eq!(result.unwrap_err(), ReaderError::ExpiryInPast);
    }

    #[test]
    fn test_close_twice() {
        let today = date(2025, 1, 1);
        let mut reader = Reader::new("Ada Lovelace", "+100", date(2025, 6, 1)).unwrap();
        reader.close(today).unwrap();
        assert!(!reader.is_active);
        assert_eq!(reader.expiry_date, today);
        assert!(!reader.can_borrow(today));
        assert_eq!(reader.close(today).unwrap_err(), ReaderError::AlreadyClosed);
    }
}
