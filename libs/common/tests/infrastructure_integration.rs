//! Integration tests for the persistence layer
//!
//! These tests verify that the schema enforces the library's integrity rules
//! even when rows are written with raw SQL.

use common::{connect_in_memory, health_check, schema};
use sqlx::{Row, SqlitePool};

const NOW: &str = "2025-01-01T00:00:00+00:00";

async fn bootstrapped() -> Result<SqlitePool, Box<dyn std::error::Error>> {
    let pool = connect_in_memory().await?;
    schema::apply(&pool).await?;
    assert!(health_check(&pool).await?, "Database health check failed");
    Ok(pool)
}

async fn insert_user(pool: &SqlitePool, name: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, 'x', ?) RETURNING id",
    )
    .bind(name)
    .bind(format!("{}@example.com", name))
    .bind(NOW)
    .fetch_one(pool)
    .await
}

async fn insert_book(pool: &SqlitePool, isbn: &str, copies: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO books (title, author, isbn, total_copies, available_copies, created_at)
         VALUES ('Title', 'Author', ?, ?, ?, ?) RETURNING id",
    )
    .bind(isbn)
    .bind(copies)
    .bind(copies)
    .bind(NOW)
    .fetch_one(pool)
    .await
}

#[tokio::test]
async fn test_copy_counts_are_constrained() -> Result<(), Box<dyn std::error::Error>> {
    let pool = bootstrapped().await?;
    let book_id = insert_book(&pool, "9780000000001", 1).await?;

    let over = sqlx::query("UPDATE books SET available_copies = 2 WHERE id = ?")
        .bind(book_id)
        .execute(&pool)
        .await;
    assert!(over.is_err(), "available_copies above total must be rejected");

    let under = sqlx::query("UPDATE books SET available_copies = -1 WHERE id = ?")
        .bind(book_id)
        .execute(&pool)
        .await;
    assert!(under.is_err(), "negative available_copies must be rejected");

    let duplicate = insert_book(&pool, "9780000000001", 1).await;
    assert!(duplicate.is_err(), "isbn must be unique");

    Ok(())
}

#[tokio::test]
async fn test_one_open_loan_per_user_and_book() -> Result<(), Box<dyn std::error::Error>> {
    let pool = bootstrapped().await?;
    let user_id = insert_user(&pool, "reader").await?;
    let book_id = insert_book(&pool, "9780000000002", 3).await?;

    let open = "INSERT INTO borrow_records (user_id, book_id, borrow_date) VALUES (?, ?, ?)";
    sqlx::query(open)
        .bind(user_id)
        .bind(book_id)
        .bind(NOW)
        .execute(&pool)
        .await?;

    let second = sqlx::query(open)
        .bind(user_id)
        .bind(book_id)
        .bind(NOW)
        .execute(&pool)
        .await;
    assert!(second.is_err(), "a second open loan must be rejected");

    sqlx::query("UPDATE borrow_records SET return_date = ?, status = 'returned'")
        .bind(NOW)
        .execute(&pool)
        .await?;

    sqlx::query(open)
        .bind(user_id)
        .bind(book_id)
        .bind(NOW)
        .execute(&pool)
        .await?;

    let inconsistent = sqlx::query(
        "UPDATE borrow_records SET return_date = ? WHERE return_date IS NULL",
    )
    .bind(NOW)
    .execute(&pool)
    .await;
    assert!(
        inconsistent.is_err(),
        "a return date requires the returned status"
    );

    Ok(())
}

#[tokio::test]
async fn test_reviews_are_constrained() -> Result<(), Box<dyn std::error::Error>> {
    let pool = bootstrapped().await?;
    let user_id = insert_user(&pool, "critic").await?;
    let book_id = insert_book(&pool, "9780000000003", 1).await?;

    let insert = "INSERT INTO reviews (user_id, book_id, rating, created_at, updated_at) VALUES (?, ?, ?, ?, ?)";
    for rating in [0, 6] {
        let result = sqlx::query(insert)
            .bind(user_id)
            .bind(book_id)
            .bind(rating)
            .bind(NOW)
            .bind(NOW)
            .execute(&pool)
            .await;
        assert!(result.is_err(), "rating {} must be rejected", rating);
    }

    sqlx::query(insert)
        .bind(user_id)
        .bind(book_id)
        .bind(5)
        .bind(NOW)
        .bind(NOW)
        .execute(&pool)
        .await?;

    let duplicate = sqlx::query(insert)
        .bind(user_id)
        .bind(book_id)
        .bind(4)
        .bind(NOW)
        .bind(NOW)
        .execute(&pool)
        .await;
    assert!(duplicate.is_err(), "one review per user and book");

    Ok(())
}

#[tokio::test]
async fn test_deleting_a_book_cascades() -> Result<(), Box<dyn std::error::Error>> {
    let pool = bootstrapped().await?;
    let user_id = insert_user(&pool, "cascade").await?;
    let book_id = insert_book(&pool, "9780000000004", 2).await?;

    sqlx::query("INSERT INTO borrow_records (user_id, book_id, borrow_date) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(book_id)
        .bind(NOW)
        .execute(&pool)
        .await?;
    sqlx::query(
        "INSERT INTO reviews (user_id, book_id, rating, created_at, updated_at) VALUES (?, ?, 3, ?, ?)",
    )
    .bind(user_id)
    .bind(book_id)
    .bind(NOW)
    .bind(NOW)
    .execute(&pool)
    .await?;

    sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(book_id)
        .execute(&pool)
        .await?;

    let row = sqlx::query(
        "SELECT (SELECT COUNT(*) FROM borrow_records) AS loans, (SELECT COUNT(*) FROM reviews) AS reviews",
    )
    .fetch_one(&pool)
    .await?;

    let loans: i64 = row.get("loans");
    let reviews: i64 = row.get("reviews");
    assert_eq!(loans, 0);
    assert_eq!(reviews, 0);

    Ok(())
}
