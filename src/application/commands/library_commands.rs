//! Library Commands - 借还

use uuid::Uuid;

/// 借书
#[derive(Debug, Clone)]
pub struct BorrowBook {
    pub book_id: Uuid,
    pub reader_id: Uuid,
}

/// 还书
#[derive(Debug, Clone)]
pub struct ReturnBook {
    pub book_id: Uuid,
}
