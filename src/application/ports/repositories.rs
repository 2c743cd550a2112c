//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite / 内存）

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::book::{Book, BookCategory, BookStatus};
use crate::domain::events::EventType;
use crate::domain::lending::Borrow;
use crate::domain::reader::Reader;
use crate::domain::reporting::{ActivityLogRecord, Report};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 分页参数（页码从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        (self.number as usize - 1) * self.size as usize
    }

    pub fn limit(&self) -> usize {
        self.size as usize
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

// ============================================================================
// Book Repository
// ============================================================================

/// 书目列表过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookListFilter {
    pub status: Option<BookStatus>,
    pub category: Option<BookCategory>,
    pub author: Option<String>,
    pub page: Page,
}

/// 馆藏列表过滤条件（不含已归档）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryBooksFilter {
    pub category: Option<BookCategory>,
    pub author: Option<String>,
    pub available_only: bool,
    pub page: Page,
}

/// Book Repository Port
#[async_trait]
pub trait BookRepositoryPort: Send + Sync {
    /// 新增书籍
    async fn create(&self, book: &Book) -> Result<(), RepositoryError>;

    /// 更新书籍
    async fn update(&self, book: &Book) -> Result<(), RepositoryError>;

    /// 根据 ID 查找
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Book>, RepositoryError>;

    /// 根据书名查找（精确匹配）
    async fn find_by_title(&self, title: &str) -> Result<Option<Book>, RepositoryError>;

    /// 按条件分页列出，按书名排序
    async fn list(&self, filter: &BookListFilter) -> Result<Vec<Book>, RepositoryError>;

    /// 分页列出馆藏（未归档）书籍，按书名排序
    async fn list_library(&self, filter: &LibraryBooksFilter) -> Result<Vec<Book>, RepositoryError>;
}

// ============================================================================
// Borrow Repository
// ============================================================================

/// Borrow Repository Port
///
/// 同一本书至多一条 Issued 借阅：`create` 在已有 Issued 记录时返回 `Duplicate`
#[async_trait]
pub trait BorrowRepositoryPort: Send + Sync {
    /// 新增借阅
    async fn create(&self, borrow: &Borrow) -> Result<(), RepositoryError>;

    /// 更新借阅
    async fn update(&self, borrow: &Borrow) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Borrow>, RepositoryError>;

    /// 书籍当前的 Issued 借阅
    async fn find_issued_by_book(&self, book_id: Uuid) -> Result<Option<Borrow>, RepositoryError>;

    /// 读者当前所有 Issued 借阅，按借出日期排序
    async fn find_issued_by_reader(&self, reader_id: Uuid) -> Result<Vec<Borrow>, RepositoryError>;
}

// ============================================================================
// Reader Repository
// ============================================================================

/// Reader Repository Port
///
/// 手机号唯一：`create` 在手机号已存在时返回 `Duplicate`
#[async_trait]
pub trait ReaderRepositoryPort: Send + Sync {
    async fn create(&self, reader: &Reader) -> Result<(), RepositoryError>;

    async fn update(&self, reader: &Reader) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reader>, RepositoryError>;

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Reader>, RepositoryError>;
}

// ============================================================================
// Report Repository
// ============================================================================

/// Report Repository Port
///
/// 报表名称唯一：`create` 在名称已存在时返回 `Duplicate`
#[async_trait]
pub trait ReportRepositoryPort: Send + Sync {
    async fn create(&self, report: &Report) -> Result<(), RepositoryError>;

    async fn update(&self, report: &Report) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Report>, RepositoryError>;

    /// 所有报表（任意状态），按创建时间倒序
    async fn list_all(&self) -> Result<Vec<Report>, RepositoryError>;
}

// ============================================================================
// Activity Log Repository
// ============================================================================

/// 活动日志过滤条件
///
/// 日期区间为闭区间，按事件自身时间（UTC 日期）过滤
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLogFilter {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub event_type: Option<EventType>,
    /// None 表示不分页
    pub page: Option<Page>,
}

/// Activity Log Repository Port（只追加）
#[async_trait]
pub trait ActivityLogRepositoryPort: Send + Sync {
    async fn append(&self, record: &ActivityLogRecord) -> Result<(), RepositoryError>;

    /// 按事件时间升序返回
    async fn find(&self, filter: &ActivityLogFilter) -> Result<Vec<ActivityLogRecord>, RepositoryError>;
}
