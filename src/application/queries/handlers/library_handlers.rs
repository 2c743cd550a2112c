//! Library Query Handlers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::cache::{keys, CacheGateway};
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, BorrowRepositoryPort, ReaderRepositoryPort};
use crate::application::queries::GetLibraryBooks;
use crate::domain::book::{Book, BookCategory, BookStatus};

const SERVICE: &str = "library-service";

/// 当前借阅人
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookHolder {
    pub reader_id: Uuid,
    pub full_name: String,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryBookItem {
    pub id: Uuid,
    pub title: String,
    pub category: BookCategory,
    pub authors: Vec<String>,
    pub year: i32,
    pub status: BookStatus,
    pub holder: Option<BookHolder>,
}

/// GetLibraryBooks Handler
pub struct GetLibraryBooksHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    borrow_repo: Arc<dyn BorrowRepositoryPort>,
    reader_repo: Arc<dyn ReaderRepositoryPort>,
    cache: CacheGateway,
}

impl GetLibraryBooksHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        borrow_repo: Arc<dyn BorrowRepositoryPort>,
        reader_repo: Arc<dyn ReaderRepositoryPort>,
        cache: CacheGateway,
    ) -> Self {
        Self {
            book_repo,
            borrow_repo,
            reader_repo,
            cache,
        }
    }

    pub async fn handle(&self, query: GetLibraryBooks) -> Result<Vec<LibraryBookItem>, ApplicationError> {
        let key = keys::library_books_key(&query.filter);
        self.cache
            .get_or_load(&key, keys::LIBRARY_BOOKS_TTL, || self.load(&query))
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to list library books"))
    }

    async fn load(&self, query: &GetLibraryBooks) -> Result<Vec<LibraryBookItem>, ApplicationError> {
        let books = self.book_repo.list_library(&query.filter).await?;
        let mut items = Vec::with_capacity(books.len());
        for book in books {
            let holder = self.holder_of(&book).await?;
            items.push(LibraryBookItem {
                id: book.id,
                category: book.category(),
                title: book.title,
                authors: book.authors,
                year: book.year,
                status: book.status,
                holder,
            });
        }
        Ok(items)
    }

    async fn holder_of(&self, book: &Book) -> Result<Option<BookHolder>, ApplicationError> {
        if book.status != BookStatus::Borrowed {
            return Ok(None);
        }
        let Some(borrow) = self.borrow_repo.find_issued_by_book(book.id).await? else {
            tracing::warn!(book_id = %book.id, "Borrowed book has no issued borrow");
            return Ok(None);
        };
        let reader = self.reader_repo.find_by_id(borrow.reader_id).await?;
        Ok(reader.map(|reader| BookHolder {
            reader_id: reader.id,
            full_name: reader.full_name,
            due_date: borrow.due_date,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BookRepositoryPort, BorrowRepositoryPort, LibraryBooksFilter, ReaderRepositoryPort};
    use crate::domain::lending::Borrow;
    use crate::test_support::{active_reader, fiction_book, today, TestContext};

    fn handler(ctx: &TestContext) -> GetLibraryBooksHandler {
        GetLibraryBooksHandler::new(
            ctx.books.clone(),
            ctx.borrows.clone(),
            ctx.readers.clone(),
            ctx.cache.clone(),
        )
    }

    #[tokio::test]
    async fn test_borrowed_book_carries_holder() {
        let ctx = TestContext::new();
        let reader = active_reader("+100");
        ctx.readers.create(&reader).await.unwrap();

        let mut borrowed = fiction_book("Dune", &["Herbert"]);
        borrowed.mark_borrowed().unwrap();
        ctx.books.create(&borrowed).await.unwrap();
        let borrow = Borrow::issue(borrowed.id, reader.id, today());
        ctx.borrows.create(&borrow).await.unwrap();

        let mut archived = fiction_book("Alpha", &["Someone"]);
        archived.archive().unwrap();
        ctx.books.create(&archived).await.unwrap();
        ctx.books.create(&fiction_book("Emma", &["Austen"])).await.unwrap();

        let items = handler(&ctx).handle(GetLibraryBooks::default()).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Dune");
        let holder = items[0].holder.as_ref().unwrap();
        assert_eq!(holder.reader_id, reader.id);
        assert_eq!(holder.due_date, borrow.due_date);
        assert!(items[1].holder.is_none());
    }

    #[tokio::test]
    async fn test_available_only_is_cached_separately() {
        let ctx = TestContext::new();
        let mut borrowed = fiction_book("Dune", &["Herbert"]);
        borrowed.mark_borrowed().unwrap();
        ctx.books.create(&borrowed).await.unwrap();
        ctx.books.create(&fiction_book("Emma", &["Austen"])).await.unwrap();
        let handler = handler(&ctx);

        let query = GetLibraryBooks {
            filter: LibraryBooksFilter {
                available_only: true,
                ..Default::default()
            },
        };
        let available = handler.handle(query.clone()).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].title, "Emma");

        assert!(ctx.is_cached(&keys::library_books_key(&query.filter)).await);
        assert!(!ctx.is_cached(&keys::library_books_key(&LibraryBooksFilter::default())).await);
    }
}
