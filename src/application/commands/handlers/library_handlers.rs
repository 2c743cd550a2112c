//! Library Command Handlers - 借还

use chrono::Utc;
use std::sync::Arc;

use crate::application::cache::{keys, CacheGateway, InvalidationPlan};
use crate::application::commands::{BorrowBook, ReturnBook};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    BookRepositoryPort, BorrowRepositoryPort, EventPublisherPort, ReaderRepositoryPort,
    RepositoryError,
};
use crate::domain::book::BookError;
use crate::domain::events::{BookBorrowed, BookReturned};
use crate::domain::lending::Borrow;
use crate::domain::reader::ReaderError;

const SERVICE: &str = "library-service";

// ============================================================================
// BorrowBook
// ============================================================================

/// BorrowBook Handler
///
/// 先读后写的检查只是快速失败；同一本书至多一条 Issued 借阅由借阅仓储保证
pub struct BorrowBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    reader_repo: Arc<dyn ReaderRepositoryPort>,
    borrow_repo: Arc<dyn BorrowRepositoryPort>,
    cache: CacheGateway,
    publisher: Arc<dyn EventPublisherPort>,
}

impl BorrowBookHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        reader_repo: Arc<dyn ReaderRepositoryPort>,
        borrow_repo: Arc<dyn BorrowRepositoryPort>,
        cache: CacheGateway,
        publisher: Arc<dyn EventPublisherPort>,
    ) -> Self {
        Self {
            book_repo,
            reader_repo,
            borrow_repo,
            cache,
            publisher,
        }
    }

    pub async fn handle(&self, command: BorrowBook) -> Result<Borrow, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to borrow book"))
    }

    async fn execute(&self, command: BorrowBook) -> Result<Borrow, ApplicationError> {
        let before = self
            .book_repo
            .find_by_id(command.book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", command.book_id))?;
        let reader = self
            .reader_repo
            .find_by_id(command.reader_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Reader", command.reader_id))?;

        let today = Utc::now().date_naive();
        if !reader.can_borrow(today) {
            return Err(ReaderError::CardInactive.into());
        }

        let mut book = before.clone();
        book.mark_borrowed()?;
        let borrow = Borrow::issue(book.id, reader.id, today);

        InvalidationPlan::for_book(&before, Some(&book))
            .with_key(keys::reader_books_key(reader.id))
            .apply(&self.cache)
            .await;

        match self.borrow_repo.create(&borrow).await {
            Ok(()) => {}
            Err(RepositoryError::Duplicate(_)) => return Err(BookError::NotAvailable.into()),
            Err(e) => return Err(e.into()),
        }
        self.book_repo.update(&book).await?;

        self.publisher
            .publish(
                BookBorrowed {
                    book_id: book.id,
                    reader_id: reader.id,
                    title: book.title.clone(),
                    borrow_date: borrow.borrow_date,
                    due_date: borrow.due_date,
                }
                .into(),
            )
            .await?;

        tracing::info!(
            borrow_id = %borrow.id,
            book_id = %book.id,
            reader_id = %reader.id,
            due_date = %borrow.due_date,
            "Book borrowed"
        );
        Ok(borrow)
    }
}

// ============================================================================
// ReturnBook
// ============================================================================

/// ReturnBook Handler
pub struct ReturnBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    borrow_repo: Arc<dyn BorrowRepositoryPort>,
    cache: CacheGateway,
    publisher: Arc<dyn EventPublisherPort>,
}

impl ReturnBookHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        borrow_repo: Arc<dyn BorrowRepositoryPort>,
        cache: CacheGateway,
        publisher: Arc<dyn EventPublisherPort>,
    ) -> Self {
        Self {
            book_repo,
            borrow_repo,
            cache,
            publisher,
        }
    }

    pub async fn handle(&self, command: ReturnBook) -> Result<Borrow, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to return book"))
    }

    async fn execute(&self, command: ReturnBook) -> Result<Borrow, ApplicationError> {
        let before = self
            .book_repo
            .find_by_id(command.book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", command.book_id))?;
        let mut borrow = self
            .borrow_repo
            .find_issued_by_book(command.book_id)
            .await?
            .ok_or_else(|| ApplicationError::invalid_state("Book is not borrowed"))?;

        let today = Utc::now().date_naive();
        borrow.return_book(today)?;
        let mut book = before.clone();
        book.mark_returned();

        InvalidationPlan::for_book(&before, Some(&book))
            .with_key(keys::reader_books_key(borrow.reader_id))
            .apply(&self.cache)
            .await;

        self.borrow_repo.update(&borrow).await?;
        self.book_repo.update(&book).await?;

        self.publisher
            .publish(
                BookReturned {
                    book_id: book.id,
                    reader_id: borrow.reader_id,
                    return_date: today,
                    status: borrow.status,
                }
                .into(),
            )
            .await?;

        tracing::info!(
            borrow_id = %borrow.id,
            book_id = %book.id,
            status = borrow.status.as_str(),
            "Book returned"
        );
        Ok(borrow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{LibraryBooksFilter, Page};
    use crate::domain::book::BookStatus;
    use crate::domain::lending::BorrowStatus;
    use crate::domain::reader::Reader;
    use crate::test_support::{active_reader, fiction_book, today, TestContext};

    fn borrow_handler(ctx: &TestContext) -> Arc<BorrowBookHandler> {
        Arc::new(BorrowBookHandler::new(
            ctx.books.clone(),
            ctx.readers.clone(),
            ctx.borrows.clone(),
            ctx.cache.clone(),
            ctx.publisher.clone(),
        ))
    }

    fn return_handler(ctx: &TestContext) -> ReturnBookHandler {
        ReturnBookHandler::new(ctx.books.clone(), ctx.borrows.clone(), ctx.cache.clone(), ctx.publisher.clone())
    }

    #[tokio::test]
    async fn test_borrow_and_return() {
        let ctx = TestContext::new();
        let book = fiction_book("Solaris", &["Lem"]);
        let reader = active_reader("+100");
        ctx.books.create(&book).await.unwrap();
        ctx.readers.create(&reader).await.unwrap();

        let available_key = keys::library_books_key(&LibraryBooksFilter {
            available_only: true,
            page: Page::default(),
            ..Default::default()
        });
        ctx.seed_cache(&available_key).await;
        ctx.seed_cache(&keys::reader_books_key(reader.id)).await;

        let borrow = borrow_handler(&ctx)
            .handle(BorrowBook {
                book_id: book.id,
                reader_id: reader.id,
            })
            .await
            .unwrap();
        assert_eq!(borrow.status, BorrowStatus::Issued);
        assert_eq!(borrow.due_date, today() + chrono::Days::new(30));
        assert_eq!(ctx.books.find_by_id(book.id).await.unwrap().unwrap().status, BookStatus::Borrowed);
        assert!(!ctx.is_cached(&available_key).await);
        assert!(!ctx.is_cached(&keys::reader_books_key(reader.id)).await);

        // 借出后进入“全部”馆藏列表的缓存也要刷新
        let all_key = keys::library_books_key(&LibraryBooksFilter::default());
        ctx.seed_cache(&all_key).await;

        let returned = return_handler(&ctx).handle(ReturnBook { book_id: book.id }).await.unwrap();
        assert_eq!(returned.status, BorrowStatus::Returned);
        assert_eq!(returned.return_date, Some(today()));
        assert_eq!(ctx.books.find_by_id(book.id).await.unwrap().unwrap().status, BookStatus::Available);
        assert!(!ctx.is_cached(&all_key).await);

        assert_eq!(ctx.publisher.kinds(), vec!["book.borrowed", "book.returned"]);
    }

    #[tokio::test]
    async fn test_concurrent_borrow_issues_once() {
        let ctx = TestContext::new();
        let book = fiction_book("Solaris", &["Lem"]);
        ctx.books.create(&book).await.unwrap();
        let first_reader = active_reader("+1");
        let second_reader = active_reader("+2");
        ctx.readers.create(&first_reader).await.unwrap();
        ctx.readers.create(&second_reader).await.unwrap();

        let handler = borrow_handler(&ctx);
        let tasks = [first_reader.id, second_reader.id].map(|reader_id| {
            let handler = handler.clone();
            tokio::spawn(async move {
                handler
                    .handle(BorrowBook {
                        book_id: book.id,
                        reader_id,
                    })
                    .await
            })
        });

        let mut issued = 0;
        let mut rejected = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(borrow) => {
                    assert_eq!(borrow.status, BorrowStatus::Issued);
                    issued += 1;
                }
                Err(ApplicationError::BusinessRuleViolation(message)) => {
                    assert!(message.contains("not available"));
                    rejected += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!((issued, rejected), (1, 1));
        assert_eq!(ctx.publisher.kinds(), vec!["book.borrowed"]);
    }

    #[tokio::test]
    async fn test_closed_card_cannot_borrow() {
        let ctx = TestContext::new();
        let book = fiction_book("Solaris", &["Lem"]);
        let mut reader = active_reader("+100");
        reader.close(today()).unwrap();
        ctx.books.create(&book).await.unwrap();
        ctx.readers.create(&reader).await.unwrap();

        let err = borrow_handler(&ctx)
            .handle(BorrowBook {
                book_id: book.id,
                reader_id: reader.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::BusinessRuleViolation(_)));
        assert!(ctx.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_return_without_borrow() {
        let ctx = TestContext::new();
        let book = fiction_book("Solaris", &["Lem"]);
        ctx.books.create(&book).await.unwrap();

        let err = return_handler(&ctx).handle(ReturnBook { book_id: book.id }).await.unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_missing_reader() {
        let ctx = TestContext::new();
        let book = fiction_book("Solaris", &["Lem"]);
        ctx.books.create(&book).await.unwrap();

        let err = borrow_handler(&ctx)
            .handle(BorrowBook {
                book_id: book.id,
                reader_id: Reader::new("x", "y", today()).unwrap().id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { resource_type: "Reader", .. }));
    }
}
