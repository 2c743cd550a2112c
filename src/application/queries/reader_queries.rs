//! Reader Queries

use uuid::Uuid;

/// 读者当前借阅中的书
#[derive(Debug, Clone)]
pub struct GetBorrowedBooks {
    pub reader_id: Uuid,
}
