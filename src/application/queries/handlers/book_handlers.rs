//! Book Query Handlers
//!
//! 缓存的是带封面预签名 URL 的响应；URL 有效期长于缓存 TTL，命中时原样返回

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::cache::{keys, CacheGateway};
use crate::application::error::ApplicationError;
use crate::application::ports::{BlobStorePort, BookRepositoryPort};
use crate::application::queries::{BookLookup, GetBookDetails, GetBooks};
use crate::domain::book::{Book, BookCategory, BookKind, BookStatus};

const SERVICE: &str = "book-service";

// ============================================================================
// Response DTOs
// ============================================================================

/// 列表项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListItem {
    pub id: Uuid,
    pub title: String,
    pub category: BookCategory,
    pub authors: Vec<String>,
    pub year: i32,
    pub status: BookStatus,
    pub cover_url: Option<String>,
}

/// 详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub id: Uuid,
    pub title: String,
    pub kind: BookKind,
    pub authors: Vec<String>,
    pub description: String,
    pub year: i32,
    pub status: BookStatus,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

async fn cover_url(
    blob_store: &dyn BlobStorePort,
    book: &Book,
    ttl_minutes: u32,
) -> Result<Option<String>, ApplicationError> {
    match &book.cover_image_path {
        Some(path) => Ok(Some(blob_store.get_url(path, ttl_minutes).await?)),
        None => Ok(None),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GetBooks Handler
pub struct GetBooksHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    blob_store: Arc<dyn BlobStorePort>,
    cache: CacheGateway,
    url_ttl_minutes: u32,
}

impl GetBooksHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        blob_store: Arc<dyn BlobStorePort>,
        cache: CacheGateway,
        url_ttl_minutes: u32,
    ) -> Self {
        Self {
            book_repo,
            blob_store,
            cache,
            url_ttl_minutes,
        }
    }

    pub async fn handle(&self, query: GetBooks) -> Result<Vec<BookListItem>, ApplicationError> {
        self.execute(query)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to list books"))
    }

    async fn execute(&self, query: GetBooks) -> Result<Vec<BookListItem>, ApplicationError> {
        let key = keys::book_list_key(&query.filter);
        self.cache
            .get_or_load(&key, keys::BOOK_LIST_TTL, || async {
                let books = self.book_repo.list(&query.filter).await?;
                let mut items = Vec::with_capacity(books.len());
                for book in books {
                    let cover_url = cover_url(self.blob_store.as_ref(), &book, self.url_ttl_minutes).await?;
                    items.push(BookListItem {
                        id: book.id,
                        category: book.category(),
                        title: book.title,
                        authors: book.authors,
                        year: book.year,
                        status: book.status,
                        cover_url,
                    });
                }
                Ok::<_, ApplicationError>(items)
            })
            .await
    }
}

/// GetBookDetails Handler
///
/// 按书名查找时先查仓储拿到 id，结果同样写入 `book:details:{id}`
pub struct GetBookDetailsHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    blob_store: Arc<dyn BlobStorePort>,
    cache: CacheGateway,
    url_ttl_minutes: u32,
}

impl GetBookDetailsHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        blob_store: Arc<dyn BlobStorePort>,
        cache: CacheGateway,
        url_ttl_minutes: u32,
    ) -> Self {
        Self {
            book_repo,
            blob_store,
            cache,
            url_ttl_minutes,
        }
    }

    pub async fn handle(&self, query: GetBookDetails) -> Result<BookDetails, ApplicationError> {
        self.execute(query)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to get book details"))
    }

    async fn execute(&self, query: GetBookDetails) -> Result<BookDetails, ApplicationError> {
        match query.lookup {
            BookLookup::Id(id) => {
                self.cache
                    .get_or_load(&keys::book_details_key(id), keys::BOOK_DETAILS_TTL, || async {
                        let book = self
                            .book_repo
                            .find_by_id(id)
                            .await?
                            .ok_or_else(|| ApplicationError::not_found("Book", id))?;
                        self.to_details(book).await
                    })
                    .await
            }
            BookLookup::Title(title) => {
                let book = self
                    .book_repo
                    .find_by_title(&title)
                    .await?
                    .ok_or_else(|| ApplicationError::not_found("Book", &title))?;
                let details = self.to_details(book).await?;
                self.cache
                    .set(&keys::book_details_key(details.id), &details, keys::BOOK_DETAILS_TTL)
                    .await;
                Ok(details)
            }
        }
    }

    async fn to_details(&self, book: Book) -> Result<BookDetails, ApplicationError> {
        let cover_url = cover_url(self.blob_store.as_ref(), &book, self.url_ttl_minutes).await?;
        Ok(BookDetails {
            id: book.id,
            title: book.title,
            kind: book.kind,
            authors: book.authors,
            description: book.description,
            year: book.year,
            status: book.status,
            cover_url,
            created_at: book.created_at,
            updated_at: book.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BookListFilter, BookRepositoryPort};
    use crate::test_support::{fiction_book, TestContext, URL_TTL_MINUTES};

    fn list_handler(ctx: &TestContext) -> GetBooksHandler {
        GetBooksHandler::new(ctx.books.clone(), ctx.blob.clone(), ctx.cache.clone(), URL_TTL_MINUTES)
    }

    fn details_handler(ctx: &TestContext) -> GetBookDetailsHandler {
        GetBookDetailsHandler::new(ctx.books.clone(), ctx.blob.clone(), ctx.cache.clone(), URL_TTL_MINUTES)
    }

    #[tokio::test]
    async fn test_list_is_read_through() {
        let ctx = TestContext::new();
        ctx.books.create(&fiction_book("Dune", &["Herbert"])).await.unwrap();
        let handler = list_handler(&ctx);

        let first = handler.handle(GetBooks::default()).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(ctx.is_cached(&keys::book_list_key(&BookListFilter::default())).await);

        // 未经失效直接写仓储，第二次读取仍命中缓存
        ctx.books.create(&fiction_book("Emma", &["Austen"])).await.unwrap();
        let second = handler.handle(GetBooks::default()).await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_list_filters_by_author() {
        let ctx = TestContext::new();
        ctx.books.create(&fiction_book("Dune", &["Herbert"])).await.unwrap();
        ctx.books.create(&fiction_book("Emma", &["Austen"])).await.unwrap();

        let query = GetBooks {
            filter: BookListFilter {
                author: Some("Austen".to_string()),
                ..Default::default()
            },
        };
        let items = list_handler(&ctx).handle(query).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Emma");
        assert_eq!(items[0].category, BookCategory::Fiction);
    }

    #[tokio::test]
    async fn test_cover_path_becomes_presigned_url() {
        let ctx = TestContext::new();
        let mut book = fiction_book("Dune", &["Herbert"]);
        book.update_details("desert".to_string(), "2025/1/cover.png".to_string()).unwrap();
        ctx.books.create(&book).await.unwrap();

        let details = details_handler(&ctx)
            .handle(GetBookDetails {
                lookup: BookLookup::Id(book.id),
            })
            .await
            .unwrap();

        let url = details.cover_url.unwrap();
        assert!(url.contains("/folio/2025/1/cover.png?expires="));
        assert!(url.contains("&signature="));
        assert!(ctx.is_cached(&keys::book_details_key(book.id)).await);
    }

    #[tokio::test]
    async fn test_cached_cover_urls_are_stable_across_reads() {
        let ctx = TestContext::new();
        let mut book = fiction_book("Dune", &["Herbert"]);
        book.update_details("desert".to_string(), "2025/1/cover.png".to_string()).unwrap();
        ctx.books.create(&book).await.unwrap();
        let list = list_handler(&ctx);
        let details = details_handler(&ctx);
        let lookup = || GetBookDetails {
            lookup: BookLookup::Id(book.id),
        };

        let first_list = serde_json::to_vec(&list.handle(GetBooks::default()).await.unwrap()).unwrap();
        let first_details = serde_json::to_vec(&details.handle(lookup()).await.unwrap()).unwrap();

        // 跨过签名时间戳的秒边界
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let second_list = serde_json::to_vec(&list.handle(GetBooks::default()).await.unwrap()).unwrap();
        let second_details = serde_json::to_vec(&details.handle(lookup()).await.unwrap()).unwrap();
        assert_eq!(first_list, second_list);
        assert_eq!(first_details, second_details);
    }

    #[tokio::test]
    async fn test_details_by_title() {
        let ctx = TestContext::new();
        let book = fiction_book("Dune", &["Herbert"]);
        ctx.books.create(&book).await.unwrap();
        let handler = details_handler(&ctx);

        let details = handler
            .handle(GetBookDetails {
                lookup: BookLookup::Title("Dune".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(details.id, book.id);
        assert!(details.cover_url.is_none());

        let err = handler
            .handle(GetBookDetails {
                lookup: BookLookup::Title("Missing".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }
}
