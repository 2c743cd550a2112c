//! Book Queries

use uuid::Uuid;

use crate::application::ports::BookListFilter;

/// 书目列表（可按状态 / 分类 / 作者过滤）
#[derive(Debug, Clone, Default)]
pub struct GetBooks {
    pub filter: BookListFilter,
}

/// 按 id 或书名查找
#[derive(Debug, Clone)]
pub enum BookLookup {
    Id(Uuid),
    Title(String),
}

/// 书籍详情
#[derive(Debug, Clone)]
pub struct GetBookDetails {
    pub lookup: BookLookup,
}
