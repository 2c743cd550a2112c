//! 缓存 key 格式与 TTL
//!
//! 列表 key = `{family}:{hash(维度)}:{page}:{pageSize}`，同一组过滤维度的所有分页共享前缀，
//! 写操作据此按前缀失效。hash 为 `|` 连接各维度后的 md5（跨进程稳定），缺省维度记为空串。

use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::{BookListFilter, LibraryBooksFilter, Page};
use crate::domain::book::{BookCategory, BookStatus};

pub const BOOK_LIST_FAMILY: &str = "books:list";
pub const LIBRARY_BOOKS_FAMILY: &str = "library:books";
pub const REPORTS_LIST_KEY: &str = "reports:list";

pub const BOOK_LIST_TTL: Duration = Duration::from_secs(10 * 60);
pub const LIBRARY_BOOKS_TTL: Duration = Duration::from_secs(5 * 60);
pub const BOOK_DETAILS_TTL: Duration = Duration::from_secs(30 * 60);
pub const READER_BOOKS_TTL: Duration = Duration::from_secs(15 * 60);
pub const REPORTS_LIST_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// 过滤维度哈希
pub fn filter_hash(dimensions: &[&str]) -> String {
    format!("{:x}", md5::compute(dimensions.join("|").as_bytes()))
}

/// 某组 (status, category, author) 的书目列表前缀
pub fn book_list_prefix(
    status: Option<BookStatus>,
    category: Option<BookCategory>,
    author: Option<&str>,
) -> String {
    let hash = filter_hash(&[
        status.map(|s| s.as_str()).unwrap_or(""),
        category.map(|c| c.as_str()).unwrap_or(""),
        author.unwrap_or(""),
    ]);
    format!("{}:{}:", BOOK_LIST_FAMILY, hash)
}

pub fn book_list_key(filter: &BookListFilter) -> String {
    let prefix = book_list_prefix(filter.status, filter.category, filter.author.as_deref());
    paged(prefix, filter.page)
}

/// 某组 (category, author, availableOnly) 的馆藏列表前缀
pub fn library_books_prefix(
    category: Option<BookCategory>,
    author: Option<&str>,
    available_only: bool,
) -> String {
    let hash = filter_hash(&[
        category.map(|c| c.as_str()).unwrap_or(""),
        author.unwrap_or(""),
        if available_only { "true" } else { "false" },
    ]);
    format!("{}:{}:", LIBRARY_BOOKS_FAMILY, hash)
}

pub fn library_books_key(filter: &LibraryBooksFilter) -> String {
    let prefix = library_books_prefix(filter.category, filter.author.as_deref(), filter.available_only);
    paged(prefix, filter.page)
}

pub fn book_details_key(book_id: Uuid) -> String {
    format!("book:details:{}", book_id)
}

pub fn reader_books_key(reader_id: Uuid) -> String {
    format!("reader:books:{}", reader_id)
}

fn paged(prefix: String, page: Page) -> String {
    format!("{}{}:{}", prefix, page.number, page.size)
}
