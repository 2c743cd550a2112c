//! Reader Query Handlers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::cache::{keys, CacheGateway};
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, BorrowRepositoryPort, ReaderRepositoryPort};
use crate::application::queries::GetBorrowedBooks;

const SERVICE: &str = "reader-service";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowedBookItem {
    pub borrow_id: Uuid,
    pub book_id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// GetBorrowedBooks Handler
///
/// 缓存在 `reader:books:{readerId}`，借书 / 还书 / 注销读者时失效
pub struct GetBorrowedBooksHandler {
    reader_repo: Arc<dyn ReaderRepositoryPort>,
    borrow_repo: Arc<dyn BorrowRepositoryPort>,
    book_repo: Arc<dyn BookRepositoryPort>,
    cache: CacheGateway,
}

impl GetBorrowedBooksHandler {
    pub fn new(
        reader_repo: Arc<dyn ReaderRepositoryPort>,
        borrow_repo: Arc<dyn BorrowRepositoryPort>,
        book_repo: Arc<dyn BookRepositoryPort>,
        cache: CacheGateway,
    ) -> Self {
        Self {
            reader_repo,
            borrow_repo,
            book_repo,
            cache,
        }
    }

    pub async fn handle(&self, query: GetBorrowedBooks) -> Result<Vec<BorrowedBookItem>, ApplicationError> {
        let key = keys::reader_books_key(query.reader_id);
        self.cache
            .get_or_load(&key, keys::READER_BOOKS_TTL, || self.load(query.reader_id))
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to get borrowed books"))
    }

    async fn load(&self, reader_id: Uuid) -> Result<Vec<BorrowedBookItem>, ApplicationError> {
        self.reader_repo
            .find_by_id(reader_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Reader", reader_id))?;

        let borrows = self.borrow_repo.find_issued_by_reader(reader_id).await?;
        let mut items = Vec::with_capacity(borrows.len());
        for borrow in borrows {
            let Some(book) = self.book_repo.find_by_id(borrow.book_id).await? else {
                tracing::warn!(borrow_id = %borrow.id, book_id = %borrow.book_id, "Issued borrow references missing book");
                continue;
            };
            items.push(BorrowedBookItem {
                borrow_id: borrow.id,
                book_id: book.id,
                title: book.title,
                authors: book.authors,
                borrow_date: borrow.borrow_date,
                due_date: borrow.due_date,
            });
        }
        Ok(items)
    }
}
