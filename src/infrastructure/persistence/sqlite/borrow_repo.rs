//! SQLite Borrow Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{db_error, parse_date, parse_uuid, unknown_value};
use super::DbPool;
use crate::application::ports::{BorrowRepositoryPort, RepositoryError};
use crate::domain::lending::{Borrow, BorrowStatus};

const BORROW_COLUMNS: &str =
    "SELECT id, book_id, reader_id, borrow_date, due_date, return_date, status FROM borrows";

/// SQLite Borrow Repository
///
/// `idx_borrows_issued_book` 部分唯一索引保证每本书至多一条 issued 记录，
/// 并发借出时后到的插入得到 `RepositoryError::Duplicate`
pub struct SqliteBorrowRepository {
    pool: DbPool,
}

impl SqliteBorrowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct BorrowRow {
    id: String,
    book_id: String,
    reader_id: String,
    borrow_date: String,
    due_date: String,
    return_date: Option<String>,
    status: String,
}

impl TryFrom<BorrowRow> for Borrow {
    type Error = RepositoryError;

    fn try_from(row: BorrowRow) -> Result<Self, Self::Error> {
        Ok(Borrow {
            id: parse_uuid(&row.id)?,
            book_id: parse_uuid(&row.book_id)?,
            reader_id: parse_uuid(&row.reader_id)?,
            borrow_date: parse_date(&row.borrow_date)?,
            due_date: parse_date(&row.due_date)?,
            return_date: row.return_date.as_deref().map(parse_date).transpose()?,
            status: BorrowStatus::from_str(&row.status)
                .ok_or_else(|| unknown_value("status", &row.status))?,
        })
    }
}

#[async_trait]
impl BorrowRepositoryPort for SqliteBorrowRepository {
    async fn create(&self, borrow: &Borrow) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO borrows (id, book_id, reader_id, borrow_date, due_date, return_date, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(borrow.id.to_string())
        .bind(borrow.book_id.to_string())
        .bind(borrow.reader_id.to_string())
        .bind(borrow.borrow_date.to_string())
        .bind(borrow.due_date.to_string())
        .bind(borrow.return_date.map(|d| d.to_string()))
        .bind(borrow.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update(&self, borrow: &Borrow) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE borrows SET due_date = ?, return_date = ?, status = ? WHERE id = ?")
            .bind(borrow.due_date.to_string())
            .bind(borrow.return_date.map(|d| d.to_string()))
            .bind(borrow.status.as_str())
            .bind(borrow.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("borrow {}", borrow.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Borrow>, RepositoryError> {
        let row: Option<BorrowRow> = sqlx::query_as(&format!("{} WHERE id = ?", BORROW_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Borrow::try_from).transpose()
    }

    async fn find_issued_by_book(&self, book_id: Uuid) -> Result<Option<Borrow>, RepositoryError> {
        let row: Option<BorrowRow> =
            sqlx::query_as(&format!("{} WHERE book_id = ? AND status = ?", BORROW_COLUMNS))
                .bind(book_id.to_string())
                .bind(BorrowStatus::Issued.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(Borrow::try_from).transpose()
    }

    async fn find_issued_by_reader(&self, reader_id: Uuid) -> Result<Vec<Borrow>, RepositoryError> {
        let rows: Vec<BorrowRow> = sqlx::query_as(&format!(
            "{} WHERE reader_id = ? AND status = ? ORDER BY borrow_date, id",
            BORROW_COLUMNS
        ))
        .bind(reader_id.to_string())
        .bind(BorrowStatus::Issued.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Borrow::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BookRepositoryPort, ReaderRepositoryPort};
    use crate::infrastructure::persistence::sqlite::{SqliteBookRepository, SqliteReaderRepository};
    use crate::infrastructure::persistence::sqlite::database::test_pool;
    use crate::test_support::{active_reader, fiction_book, today};

    #[tokio::test]
    async fn test_one_issued_borrow_per_book() {
        let pool = test_pool().await;
        let book = fiction_book("Dune", &["Herbert"]);
        SqliteBookRepository::new(pool.clone()).create(&book).await.unwrap();
        let readers = SqliteReaderRepository::new(pool.clone());
        let (first_reader, second_reader) = (active_reader("+1"), active_reader("+2"));
        readers.create(&first_reader).await.unwrap();
        readers.create(&second_reader).await.unwrap();
        let repo = SqliteBorrowRepository::new(pool);

        let mut first = Borrow::issue(book.id, first_reader.id, today());
        repo.create(&first).await.unwrap();
        let err = repo
            .create(&Borrow::issue(book.id, second_reader.id, today()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
        assert_eq!(repo.find_issued_by_book(book.id).await.unwrap().unwrap().id, first.id);

        // 归还后可以再次借出
        first.return_book(today()).unwrap();
        repo.update(&first).await.unwrap();
        assert!(repo.find_issued_by_book(book.id).await.unwrap().is_none());
        assert!(repo.find_issued_by_reader(first_reader.id).await.unwrap().is_empty());

        let second = Borrow::issue(book.id, second_reader.id, today());
        repo.create(&second).await.unwrap();
        let issued = repo.find_issued_by_reader(second_reader.id).await.unwrap();
        assert_eq!(issued, vec![second]);
        assert_eq!(repo.find_by_id(first.id).await.unwrap().unwrap(), first);
    }
}
