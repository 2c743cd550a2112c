//! Book Context - 书目限界上下文
//!
//! 职责:
//! - 书籍聚合及其状态迁移（借出 / 归还 / 归档）
//! - 分类专属字段（tagged variant）

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::Book;
pub use errors::BookError;
pub use value_objects::{
    is_valid_cover_extension, BookCategory, BookKind, BookStatus, COVER_EXTENSIONS,
    MAX_COVER_SIZE,
};
