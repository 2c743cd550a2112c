//! Library Queries

use crate::application::ports::LibraryBooksFilter;

/// 馆藏列表（不含已归档），借出中的书附带当前借阅人
#[derive(Debug, Clone, Default)]
pub struct GetLibraryBooks {
    pub filter: LibraryBooksFilter,
}
