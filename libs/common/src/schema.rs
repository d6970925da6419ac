//! Library schema bootstrap
//!
//! Tables are created idempotently at startup. Integrity rules that must
//! hold no matter which code path writes a row live here as constraints:
//! copy counts stay within `0..=total_copies`, ratings stay within `1..=5`,
//! a user has at most one open loan per book and one review per book.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DatabaseError, DatabaseResult};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        author TEXT NOT NULL,
        isbn TEXT NOT NULL UNIQUE,
        total_copies INTEGER NOT NULL DEFAULT 1,
        available_copies INTEGER NOT NULL DEFAULT 1,
        description TEXT,
        publication_year INTEGER,
        genre TEXT,
        image_url TEXT,
        created_at TEXT NOT NULL,
        CHECK (total_copies >= 0),
        CHECK (available_copies >= 0 AND available_copies <= total_copies)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS borrow_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
        borrow_date TEXT NOT NULL,
        due_date TEXT,
        return_date TEXT,
        status TEXT NOT NULL DEFAULT 'borrowed'
            CHECK (status IN ('borrowed', 'returned', 'overdue')),
        fine_amount REAL NOT NULL DEFAULT 0.0,
        CHECK (return_date IS NULL OR status = 'returned')
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_borrow_records_open
        ON borrow_records (user_id, book_id)
        WHERE return_date IS NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_borrow_records_due
        ON borrow_records (due_date)
        WHERE return_date IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
        rating INTEGER NOT NULL CHECK (rating >= 1 AND rating <= 5),
        comment TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (user_id, book_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_reviews_book ON reviews (book_id)
    "#,
];

/// Create every table and index the library service needs.
pub async fn apply(pool: &SqlitePool) -> DatabaseResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(DatabaseError::Schema)?;
    }

    info!("Database schema is up to date");
    Ok(())
}
