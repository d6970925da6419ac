//! Borrow and return workflows

use chrono::{Duration, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, warn};

use super::{RepositoryError, RepositoryResult, unique_violation};
use crate::models::{BookSummary, BorrowRecord, BorrowStatus};

const RECORD_COLUMNS: &str =
    "id, user_id, book_id, borrow_date, due_date, return_date, status, fine_amount";

async fn select_record(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<BorrowRecord>, sqlx::Error> {
    let sql = format!("SELECT {} FROM borrow_records WHERE id = ?", RECORD_COLUMNS);
    sqlx::query_as::<_, BorrowRecord>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Borrow repository for database operations
#[derive(Clone)]
pub struct BorrowRepository {
    pool: SqlitePool,
    loan_period: Duration,
}

impl BorrowRepository {
    /// Create a new borrow repository. New loans are due `loan_period` after
    /// they start.
    pub fn new(pool: SqlitePool, loan_period: Duration) -> Self {
        Self { pool, loan_period }
    }

    /// Borrow one copy of a book
    ///
    /// The copy is taken with a conditional decrement that also refuses when
    /// the user already holds an open loan for the book. When nothing was
    /// updated the reason is worked out afterwards inside the same
    /// transaction, which is then rolled back.
    pub async fn borrow(&self, user_id: i64, book_id: i64) -> RepositoryResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1
            WHERE id = ?
              AND available_copies > 0
              AND NOT EXISTS (
                  SELECT 1 FROM borrow_records
                  WHERE user_id = ? AND book_id = ? AND return_date IS NULL
              )
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            return Err(self.borrow_refusal(&mut tx, user_id, book_id).await?);
        }

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO borrow_records (user_id, book_id, borrow_date, due_date, status, fine_amount)
             VALUES (?, ?, ?, ?, ?, 0)
             RETURNING {}",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, BorrowRecord>(&sql)
            .bind(user_id)
            .bind(book_id)
            .bind(now)
            .bind(now + self.loan_period)
            .bind(BorrowStatus::Borrowed)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => {
                    RepositoryError::Conflict("You already have this book borrowed".to_string())
                }
                None => e.into(),
            })?;

        tx.commit().await?;

        info!(
            "User {} borrowed book {} (record {})",
            user_id, book_id, record.id
        );
        Ok(record)
    }

    async fn borrow_refusal(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        book_id: i64,
    ) -> RepositoryResult<RepositoryError> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM books WHERE id = ?")
            .bind(book_id)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            return Ok(RepositoryError::NotFound("Book"));
        }

        let open: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM borrow_records WHERE user_id = ? AND book_id = ? AND return_date IS NULL",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;
        if open.is_some() {
            return Ok(RepositoryError::Conflict(
                "You already have this book borrowed".to_string(),
            ));
        }

        Ok(RepositoryError::Conflict("No copies available".to_string()))
    }

    /// Return a borrowed book. Only the borrower may return it, and only once.
    pub async fn return_book(&self, record_id: i64, user_id: i64) -> RepositoryResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query(
            r#"
            UPDATE borrow_records
            SET return_date = ?, status = ?
            WHERE id = ? AND user_id = ? AND return_date IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(BorrowStatus::Returned)
        .bind(record_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let record = select_record(&mut tx, record_id)
            .await?
            .ok_or(RepositoryError::NotFound("Borrow record"))?;

        if closed.rows_affected() == 0 {
            if record.user_id != user_id {
                return Err(RepositoryError::Forbidden(
                    "You can only return your own borrowed books".to_string(),
                ));
            }
            return Err(RepositoryError::Conflict("Book already returned".to_string()));
        }

        let restored = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies + 1
            WHERE id = ? AND available_copies < total_copies
            "#,
        )
        .bind(record.book_id)
        .execute(&mut *tx)
        .await?;

        if restored.rows_affected() == 0 {
            warn!(
                "Book {} already at full availability when record {} was returned",
                record.book_id, record.id
            );
        }

        tx.commit().await?;

        info!(
            "User {} returned book {} (record {})",
            user_id, record.book_id, record.id
        );
        Ok(record)
    }

    /// A user's loans, newest first, each with a summary of its book
    pub async fn list_for_user(
        &self,
        user_id: i64,
    ) -> RepositoryResult<Vec<(BorrowRecord, BookSummary)>> {
        let rows = sqlx::query(
            r#"
            SELECT br.id, br.user_id, br.book_id, br.borrow_date, br.due_date,
                   br.return_date, br.status, br.fine_amount,
                   b.title, b.author
            FROM borrow_records br
            JOIN books b ON b.id = br.book_id
            WHERE br.user_id = ?
            ORDER BY br.borrow_date DESC, br.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut loans = Vec::with_capacity(rows.len());
        for row in rows {
            let record = BorrowRecord {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                book_id: row.try_get("book_id")?,
                borrow_date: row.try_get("borrow_date")?,
                due_date: row.try_get("due_date")?,
                return_date: row.try_get("return_date")?,
                status: row.try_get("status")?,
                fine_amount: row.try_get("fine_amount")?,
            };
            let book = BookSummary {
                id: record.book_id,
                title: row.try_get("title")?,
                author: row.try_get("author")?,
            };
            loans.push((record, book));
        }

        Ok(loans)
    }
}
