//! Book Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BookCategory, BookError, BookKind, BookStatus};

/// Book 聚合根
///
/// 不变量:
/// - 至少一位作者
/// - 已归档的书不可再修改
/// - 借出中的书不可归档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub kind: BookKind,
    pub authors: Vec<String>,
    pub description: String,
    pub year: i32,
    pub status: BookStatus,
    pub cover_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// 创建新书（初始状态 Available）
    pub fn new(
        title: impl Into<String>,
        kind: BookKind,
        authors: Vec<String>,
        description: impl Into<String>,
        year: i32,
    ) -> Result<Self, BookError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(BookError::EmptyTitle);
        }
        if authors.is_empty() {
            return Err(BookError::NoAuthors);
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title,
            kind,
            authors,
            description: description.into(),
            year,
            status: BookStatus::Available,
            cover_image_path: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn category(&self) -> BookCategory {
        self.kind.category()
    }

    pub fn is_archived(&self) -> bool {
        self.status == BookStatus::Archived
    }

    pub fn is_available(&self) -> bool {
        self.status == BookStatus::Available
    }

    /// 借出中的书不可归档
    pub fn can_be_archived(&self) -> bool {
        self.status != BookStatus::Borrowed
    }

    /// 更新书目信息
    pub fn update_info(
        &mut self,
        title: String,
        authors: Vec<String>,
        description: String,
        year: i32,
    ) -> Result<(), BookError> {
        if self.is_archived() {
            return Err(BookError::Archived);
        }
        if title.trim().is_empty() {
            return Err(BookError::EmptyTitle);
        }
        if authors.is_empty() {
            return Err(BookError::NoAuthors);
        }
        self.title = title;
        self.authors = authors;
        self.description = description;
        self.year = year;
        self.touch();
        Ok(())
    }

    /// 更新描述和封面路径
    pub fn update_details(&mut self, description: String, cover_image_path: String) -> Result<(), BookError> {
        if self.is_archived() {
            return Err(BookError::Archived);
        }
        self.description = description;
        self.cover_image_path = Some(cover_image_path);
        self.touch();
        Ok(())
    }

    /// 归档
    pub fn archive(&mut self) -> Result<(), BookError> {
        if self.is_archived() {
            return Err(BookError::AlreadyArchived);
        }
        if !self.can_be_archived() {
            return Err(BookError::CannotArchive);
        }
        self.status = BookStatus::Archived;
        self.touch();
        Ok(())
    }

    /// 借出
    pub fn mark_borrowed(&mut self) -> Result<(), BookError> {
        if !self.is_available() {
            return Err(BookError::NotAvailable);
        }
        self.status = BookStatus::Borrowed;
        self.touch();
        Ok(())
    }

    /// 归还
    pub fn mark_returned(&mut self) {
        if self.status == BookStatus::Borrowed {
            self.status = BookStatus::Available;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fiction() -> Book {
        Book::new(
            "Solaris",
            BookKind::Fiction {
                genre: "sci-fi".to_string(),
            },
            vec!["Stanislaw Lem".to_string()],
            "",
            1961,
        )
        .unwrap()
    }

    #[test]
    fn test_new_book_is_available() {
        let book = fiction();
        assert_eq!(book.status, BookStatus::Available);
        assert!(!book.is_archived());
        assert_eq!(book.category(), BookCategory::Fiction);
    }

    #[test]
    fn test_new_book_requires_author() {
        let result = Book::new(
            "Untitled",
            BookKind::Educational {
                level: "school".to_string(),
            },
            vec![],
            "",
            2000,
        );
        assert_eq!(result.unwrap_err(), BookError::NoAuthors);
    }

    #[test]
    fn test_archive_twice() {
        let mut book = fiction();
        book.archive().unwrap();
        assert_eq!(book.status, BookStatus::Archived);
        assert_eq!(book.archive().unwrap_err(), BookError::AlreadyArchived);
    }

    #[test]
    fn test_borrowed_book_cannot_be_archived() {
        let mut book = fiction();
        book.mark_borrowed().unwrap();
        assert_eq!(book.archive().unwrap_err(), BookError::CannotArchive);
        assert_eq!(book.mark_borrowed().unwrap_err(), BookError::NotAvailable);

        book.mark_returned();
        assert!(book.is_available());
    }

    #[test]
    fn test_archived_book_rejects_updates() {
        let mut book = fiction();
        book.archive().unwrap();
        let result = book.update_info("X".to_string(), vec!["A".to_string()], String::new(), 1);
        assert_eq!(result.unwrap_err(), BookError::Archived);
    }
}
