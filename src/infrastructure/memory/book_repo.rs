//! In-Memory Book Repository

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{
    BookListFilter, BookRepositoryPort, LibraryBooksFilter, Page, RepositoryError,
};
use crate::domain::book::{Book, BookStatus};

/// 内存书目仓储
pub struct InMemoryBookRepository {
    books: DashMap<Uuid, Book>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 过滤、按书名排序并分页
    fn select(&self, page: Page, predicate: impl Fn(&Book) -> bool) -> Vec<Book> {
        let mut books: Vec<Book> = self
            .books
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        books.into_iter().skip(page.offset()).take(page.limit()).collect()
    }
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn has_author(book: &Book, author: Option<&str>) -> bool {
    author.map_or(true, |author| book.authors.iter().any(|a| a == author))
}

#[async_trait]
impl BookRepositoryPort for InMemoryBookRepository {
    async fn create(&self, book: &Book) -> Result<(), RepositoryError> {
        if self.books.contains_key(&book.id) {
            return Err(RepositoryError::Duplicate(format!("book {}", book.id)));
        }
        self.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn update(&self, book: &Book) -> Result<(), RepositoryError> {
        let mut stored = self
            .books
            .get_mut(&book.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("book {}", book.id)))?;
        *stored = book.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Book>, RepositoryError> {
        Ok(self.books.get(&id).map(|b| b.clone()))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Book>, RepositoryError> {
        Ok(self
            .books
            .iter()
            .find(|entry| entry.title == title)
            .map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &BookListFilter) -> Result<Vec<Book>, RepositoryError> {
        Ok(self.select(filter.page, |book| {
            filter.status.map_or(true, |s| book.status == s)
                && filter.category.map_or(true, |c| book.category() == c)
                && has_author(book, filter.author.as_deref())
        }))
    }

    async fn list_library(&self, filter: &LibraryBooksFilter) -> Result<Vec<Book>, RepositoryError> {
        Ok(self.select(filter.page, |book| {
            !book.is_archived()
                && (!filter.available_only || book.status == BookStatus::Available)
                && filter.category.map_or(true, |c| book.category() == c)
                && has_author(book, filter.author.as_deref())
        }))
    }
}
