//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（仓储、缓存、对象存储、事件发布）
//! - cache: 类型化缓存网关、key 构造与失效计划
//! - commands: CQRS 命令及处理器（写路径：失效 → 持久化 → 发布）
//! - queries: CQRS 查询及处理器（cache-aside）
//! - consumers: 各队列的事件处理器
//! - error: 应用层错误定义

pub mod cache;
pub mod commands;
pub mod consumers;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use cache::{BookDimensions, CacheGateway, InvalidationPlan};

pub use commands::{
    AddBookDetails, ArchiveBook, BorrowBook, CloseReader, CreateBook, CreateReader, CreateReport,
    ExtendReader, GenerateReport, ReturnBook, UpdateBook,
    handlers::{
        AddBookDetailsHandler, ArchiveBookHandler, ArchiveBookResponse, BorrowBookHandler,
        CloseReaderHandler, CreateBookHandler, CreateReaderHandler, CreateReportHandler,
        ExtendReaderHandler, ReportGenerator, ReturnBookHandler, UpdateBookHandler,
    },
};

pub use consumers::{ActivityLogHandler, EventHandler, ReportGenerateHandler};

pub use error::ApplicationError;

pub use ports::{
    ActivityLogFilter, ActivityLogRepositoryPort, BlobStoreError, BlobStorePort, BookListFilter,
    BookRepositoryPort, BorrowRepositoryPort, CacheError, CacheStorePort, EventPublisherPort,
    LibraryBooksFilter, Page, PublishError, ReaderRepositoryPort, ReportRepositoryPort,
    RepositoryError,
};

pub use queries::{
    BookLookup, GetActivityLogs, GetBookDetails, GetBooks, GetBorrowedBooks, GetLibraryBooks,
    GetReportFileUrl, GetReports,
    handlers::{
        BookDetails, BookHolder, BookListItem, BorrowedBookItem, GetActivityLogsHandler,
        GetBookDetailsHandler, GetBooksHandler, GetBorrowedBooksHandler, GetLibraryBooksHandler,
        GetReportFileUrlHandler, GetReportsHandler, LibraryBookItem, ReportFileUrl,
    },
};
