//! SQLite Book Repository

use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::database::{db_error, format_timestamp, parse_timestamp, parse_uuid, unknown_value};
use super::DbPool;
use crate::application::ports::{
    BookListFilter, BookRepositoryPort, LibraryBooksFilter, Page, RepositoryError,
};
use crate::domain::book::{Book, BookCategory, BookStatus};

const BOOK_COLUMNS: &str = "SELECT id, title, kind, authors, description, year, status, cover_image_path, created_at, updated_at FROM books";

/// SQLite Book Repository
///
/// authors 以 JSON 数组存储，按作者过滤通过 json_each 完成
pub struct SqliteBookRepository {
    pool: DbPool,
}

impl SqliteBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn select(&self, mut query: QueryBuilder<'_, Sqlite>, page: Page) -> Result<Vec<Book>, RepositoryError> {
        query
            .push(" ORDER BY title, id LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows: Vec<BookRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(Book::try_from).collect()
    }
}

#[derive(FromRow)]
struct BookRow {
    id: String,
    title: String,
    kind: String,
    authors: String,
    description: String,
    year: i64,
    status: String,
    cover_image_path: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<BookRow> for Book {
    type Error = RepositoryError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Book {
            id: parse_uuid(&row.id)?,
            title: row.title,
            kind: serde_json::from_str(&row.kind)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            authors: serde_json::from_str(&row.authors)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            description: row.description,
            year: row.year as i32,
            status: BookStatus::from_str(&row.status)
                .ok_or_else(|| unknown_value("status", &row.status))?,
            cover_image_path: row.cover_image_path,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

fn encode(book: &Book) -> Result<(String, String), RepositoryError> {
    let kind = serde_json::to_string(&book.kind)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
    let authors = serde_json::to_string(&book.authors)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
    Ok((kind, authors))
}

fn push_common_filters(query: &mut QueryBuilder<'_, Sqlite>, category: Option<BookCategory>, author: Option<&str>) {
    if let Some(category) = category {
        query.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(author) = author {
        query
            .push(" AND EXISTS (SELECT 1 FROM json_each(books.authors) WHERE json_each.value = ")
            .push_bind(author.to_string())
            .push(")");
    }
}

#[async_trait]
impl BookRepositoryPort for SqliteBookRepository {
    async fn create(&self, book: &Book) -> Result<(), RepositoryError> {
        let (kind, authors) = encode(book)?;
        sqlx::query(
            r#"
            INSERT INTO books (id, title, category, kind, authors, description, year, status, cover_image_path, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(book.id.to_string())
        .bind(&book.title)
        .bind(book.category().as_str())
        .bind(kind)
        .bind(authors)
        .bind(&book.description)
        .bind(book.year as i64)
        .bind(book.status.as_str())
        .bind(&book.cover_image_path)
        .bind(format_timestamp(&book.created_at))
        .bind(format_timestamp(&book.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update(&self, book: &Book) -> Result<(), RepositoryError> {
        let (kind, authors) = encode(book)?;
        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = ?, category = ?, kind = ?, authors = ?, description = ?,
                year = ?, status = ?, cover_image_path = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&book.title)
        .bind(book.category().as_str())
        .bind(kind)
        .bind(authors)
        .bind(&book.description)
        .bind(book.year as i64)
        .bind(book.status.as_str())
        .bind(&book.cover_image_path)
        .bind(format_timestamp(&book.updated_at))
        .bind(book.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("book {}", book.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Book>, RepositoryError> {
        let row: Option<BookRow> = sqlx::query_as(&format!("{} WHERE id = ?", BOOK_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Book::try_from).transpose()
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Book>, RepositoryError> {
        let row: Option<BookRow> =
            sqlx::query_as(&format!("{} WHERE title = ? ORDER BY created_at LIMIT 1", BOOK_COLUMNS))
                .bind(title)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(Book::try_from).transpose()
    }

    async fn list(&self, filter: &BookListFilter) -> Result<Vec<Book>, RepositoryError> {
        let mut query = QueryBuilder::new(BOOK_COLUMNS);
        query.push(" WHERE 1 = 1");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        push_common_filters(&mut query, filter.category, filter.author.as_deref());
        self.select(query, filter.page).await
    }

    async fn list_library(&self, filter: &LibraryBooksFilter) -> Result<Vec<Book>, RepositoryError> {
        let mut query = QueryBuilder::new(BOOK_COLUMNS);
        query
            .push(" WHERE status <> ")
            .push_bind(BookStatus::Archived.as_str());
        if filter.available_only {
            query
                .push(" AND status = ")
                .push_bind(BookStatus::Available.as_str());
        }
        push_common_filters(&mut query, filter.category, filter.author.as_deref());
        self.select(query, filter.page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::database::test_pool;
    use crate::test_support::fiction_book;

    #[tokio::test]
    async fn test_round_trip_keeps_kind_and_authors() {
        let repo = SqliteBookRepository::new(test_pool().await);
        let mut book = fiction_book("Good Omens", &["Pratchett", "Gaiman"]);
        book.update_details("apocalypse".to_string(), "2025/3/x.png".to_string()).unwrap();
        repo.create(&book).await.unwrap();

        let stored = repo.find_by_id(book.id).await.unwrap().unwrap();
        assert_eq!(stored.kind, book.kind);
        assert_eq!(stored.authors, book.authors);
        assert_eq!(stored.cover_image_path.as_deref(), Some("2025/3/x.png"));
        assert_eq!(stored.updated_at.timestamp_micros(), book.updated_at.timestamp_micros());

        assert_eq!(repo.find_by_title("Good Omens").await.unwrap().unwrap().id, book.id);
        assert!(repo.find_by_title("Bad Omens").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let repo = SqliteBookRepository::new(test_pool().await);
        let err = repo.update(&fiction_book("Ghost", &["Nobody"])).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_filters_and_paging() {
        let repo = SqliteBookRepository::new(test_pool().await);
        let mut archived = fiction_book("Archive", &["Gaiman"]);
        archived.archive().unwrap();
        let mut borrowed = fiction_book("Borrowed", &["Pratchett", "Gaiman"]);
        borrowed.mark_borrowed().unwrap();
        for book in [&archived, &borrowed, &fiction_book("Coraline", &["Gaiman"]), &fiction_book("Dune", &["Herbert"])] {
            repo.create(book).await.unwrap();
        }

        let by_author = repo
            .list(&BookListFilter {
                author: Some("Gaiman".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let titles: Vec<&str> = by_author.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Archive", "Borrowed", "Coraline"]);

        let second_page = repo
            .list(&BookListFilter {
                page: Page::new(2, 2),
                ..Default::default()
            })
            .await
            .unwrap();
        let titles: Vec<&str> = second_page.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Coraline", "Dune"]);

        let library = repo.list_library(&LibraryBooksFilter::default()).await.unwrap();
        assert_eq!(library.len(), 3);

        let available = repo
            .list_library(&LibraryBooksFilter {
                category: Some(BookCategory::Fiction),
                author: Some("Gaiman".to_string()),
                available_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].title, "Coraline");
    }
}
