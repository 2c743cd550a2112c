//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod blob_store;
mod cache_store;
mod event_publisher;
mod repositories;

pub use blob_store::{BlobStoreError, BlobStorePort};
pub use cache_store::{CacheError, CacheStorePort};
pub use event_publisher::{EventPublisherPort, PublishError};
pub use repositories::{
    ActivityLogFilter, ActivityLogRepositoryPort, BookListFilter, BookRepositoryPort,
    BorrowRepositoryPort, LibraryBooksFilter, Page, ReaderRepositoryPort, ReportRepositoryPort,
    RepositoryError,
};
