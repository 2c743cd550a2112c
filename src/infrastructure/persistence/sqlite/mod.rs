//! SQLite Persistence - SQLite 数据库持久化实现

mod book_repo;
mod borrow_repo;
mod database;
mod reader_repo;
mod report_repo;

pub use book_repo::SqliteBookRepository;
pub use borrow_repo::SqliteBorrowRepository;
pub use database::{create_pool, run_migrations, DatabaseConfig, DbPool};
pub use reader_repo::SqliteReaderRepository;
pub use report_repo::{SqliteActivityLogRepository, SqliteReportRepository};
