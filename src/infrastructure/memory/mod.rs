//! Memory Layer - 内存仓储实现
//!
//! 基于 DashMap，实现全部仓储端口；用于测试与本地开发

mod book_repo;
mod borrow_repo;
mod reader_repo;
mod report_repo;

pub use book_repo::InMemoryBookRepository;
pub use borrow_repo::InMemoryBorrowRepository;
pub use reader_repo::InMemoryReaderRepository;
pub use report_repo::{InMemoryActivityLogRepository, InMemoryReportRepository};
