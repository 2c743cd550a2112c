//! Book Commands

use uuid::Uuid;

use crate::domain::book::BookKind;

/// 新增书籍
#[derive(Debug, Clone)]
pub struct CreateBook {
    pub title: String,
    pub kind: BookKind,
    pub authors: Vec<String>,
    pub description: String,
    pub year: i32,
}

/// 更新书目信息
#[derive(Debug, Clone)]
pub struct UpdateBook {
    pub book_id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub year: i32,
}

/// 归档书籍
#[derive(Debug, Clone)]
pub struct ArchiveBook {
    pub book_id: Uuid,
}

/// 补充描述并上传封面
#[derive(Debug, Clone)]
pub struct AddBookDetails {
    pub book_id: Uuid,
    pub description: String,
    /// 原始文件名，用于取扩展名
    pub file_name: String,
    pub image: Vec<u8>,
}
