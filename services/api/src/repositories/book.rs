//! Book catalog repository

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use super::{RepositoryError, RepositoryResult, unique_violation};
use crate::models::{Book, BookQuery, NewBook, UpdateBook};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author, b.isbn, b.total_copies, b.available_copies,
           b.description, b.publication_year, b.genre, b.image_url, b.created_at,
           CAST(COALESCE(AVG(r.rating), 0) AS REAL) AS average_rating,
           COUNT(r.id) AS review_count
    FROM books b
    LEFT JOIN reviews r ON r.book_id = b.id
"#;

fn isbn_conflict(e: sqlx::Error) -> RepositoryError {
    match unique_violation(&e) {
        Some(_) => RepositoryError::Conflict("A book with this ISBN already exists".to_string()),
        None => e.into(),
    }
}

async fn select_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Book>, sqlx::Error> {
    let sql = format!("{} WHERE b.id = ? GROUP BY b.id", BOOK_SELECT);
    sqlx::query_as::<_, Book>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Book repository for database operations
#[derive(Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Create a new book repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List books with their review statistics, optionally filtered and paged
    pub async fn list(&self, query: &BookQuery) -> RepositoryResult<Vec<Book>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(BOOK_SELECT);
        builder.push(" WHERE 1 = 1");

        if let Some(genre) = query.genre.as_deref().filter(|g| !g.trim().is_empty()) {
            builder.push(" AND b.genre = ").push_bind(genre.trim().to_string());
        }

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim().to_lowercase());
            builder
                .push(" AND (LOWER(b.title) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(b.author) LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" GROUP BY b.id ORDER BY b.id");

        if let Some((limit, offset)) = query.window() {
            builder
                .push(" LIMIT ")
                .push_bind(limit)
                .push(" OFFSET ")
                .push_bind(offset);
        }

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    /// Get a book by ID
    pub async fn get(&self, id: i64) -> RepositoryResult<Option<Book>> {
        let mut conn = self.pool.acquire().await?;
        Ok(select_by_id(&mut conn, id).await?)
    }

    /// Add a book to the catalog
    pub async fn create(&self, new_book: NewBook) -> RepositoryResult<Book> {
        let book = new_book.normalized().map_err(RepositoryError::Invalid)?;
        info!("Adding book to catalog: {} ({})", book.title, book.isbn);

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author, isbn, total_copies, available_copies,
                               description, publication_year, genre, image_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(&book.description)
        .bind(book.publication_year)
        .bind(&book.genre)
        .bind(&book.image_url)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(isbn_conflict)?;

        let created = select_by_id(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound("Book"))?;
        tx.commit().await?;

        Ok(created)
    }

    /// Apply a partial update to a book
    ///
    /// The stored row is read without holding a transaction, and the write
    /// is a single statement conditional on the copy counts that were read.
    /// A borrow or return landing in between turns into a conflict instead
    /// of being overwritten.
    pub async fn update(&self, id: i64, update: UpdateBook) -> RepositoryResult<Book> {
        let current = self.get(id).await?.ok_or(RepositoryError::NotFound("Book"))?;
        let merged = update.merge(&current).map_err(RepositoryError::Invalid)?;

        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = ?, author = ?, isbn = ?, total_copies = ?, available_copies = ?,
                description = ?, publication_year = ?, genre = ?, image_url = ?
            WHERE id = ? AND total_copies = ? AND available_copies = ?
            "#,
        )
        .bind(&merged.title)
        .bind(&merged.author)
        .bind(&merged.isbn)
        .bind(merged.total_copies)
        .bind(merged.available_copies)
        .bind(&merged.description)
        .bind(merged.publication_year)
        .bind(&merged.genre)
        .bind(&merged.image_url)
        .bind(id)
        .bind(current.total_copies)
        .bind(current.available_copies)
        .execute(&self.pool)
        .await
        .map_err(isbn_conflict)?;

        if result.rows_affected() == 0 {
            return Err(match self.get(id).await? {
                None => RepositoryError::NotFound("Book"),
                Some(_) => RepositoryError::Conflict(
                    "Book copies changed while updating, please retry".to_string(),
                ),
            });
        }

        let updated = self.get(id).await?.ok_or(RepositoryError::NotFound("Book"))?;

        info!("Updated book {}", id);
        Ok(updated)
    }

    /// Remove a book together with its borrow records and reviews
    pub async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Book"));
        }

        info!("Deleted book {}", id);
        Ok(())
    }
}
