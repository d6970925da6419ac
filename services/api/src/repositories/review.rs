//! Review repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::{RepositoryError, RepositoryResult, unique_violation};
use crate::models::{BookReview, NewReview, Review};

const REVIEW_COLUMNS: &str = "id, user_id, book_id, rating, comment, created_at, updated_at";

const ALREADY_REVIEWED: &str = "You have already reviewed this book";

/// Review repository for database operations
#[derive(Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    /// Create a new review repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a user's single review of a book
    ///
    /// The insert selects the book row, so a missing book inserts nothing
    /// and a second review by the same user trips the unique constraint.
    /// Being one statement, it takes the write lock without first holding a
    /// read snapshot.
    pub async fn add(&self, user_id: i64, review: &NewReview) -> RepositoryResult<Review> {
        if let Err(reason) = review.validate_rating() {
            let book: Option<i64> = sqlx::query_scalar("SELECT id FROM books WHERE id = ?")
                .bind(review.book_id)
                .fetch_optional(&self.pool)
                .await?;
            return Err(match book {
                None => RepositoryError::NotFound("Book"),
                Some(_) => RepositoryError::Invalid(reason),
            });
        }

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO reviews (user_id, book_id, rating, comment, created_at, updated_at)
             SELECT ?, id, ?, ?, ?, ? FROM books WHERE id = ?
             RETURNING {}",
            REVIEW_COLUMNS
        );
        let created = sqlx::query_as::<_, Review>(&sql)
            .bind(user_id)
            .bind(review.rating)
            .bind(review.comment())
            .bind(now)
            .bind(now)
            .bind(review.book_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => RepositoryError::Conflict(ALREADY_REVIEWED.to_string()),
                None => e.into(),
            })?
            .ok_or(RepositoryError::NotFound("Book"))?;

        info!(
            "User {} reviewed book {} with rating {}",
            user_id, created.book_id, created.rating
        );
        Ok(created)
    }

    /// Reviews of a book, oldest first, with reviewer usernames
    pub async fn list_for_book(&self, book_id: i64) -> RepositoryResult<Vec<BookReview>> {
        let reviews = sqlx::query_as::<_, BookReview>(
            r#"
            SELECT r.id, r.user_id, u.username, r.rating, r.comment, r.created_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.book_id = ?
            ORDER BY r.created_at, r.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// All reviews written by a user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> RepositoryResult<Vec<Review>> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            REVIEW_COLUMNS
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewBook;
    use crate::repositories::BookRepository;
    use crate::test_support;

    fn review(book_id: i64, rating: i64, comment: Option<&str>) -> NewReview {
        NewReview {
            book_id,
            rating,
            comment: comment.map(String::from),
        }
    }

    fn emma() -> NewBook {
        NewBook {
            title: "Emma".into(),
            author: "Jane Austen".into(),
            isbn: "9780141439587".into(),
            total_copies: None,
            available_copies: None,
            description: None,
            publication_year: Some(1815),
            genre: Some("Classic".into()),
            image_url: None,
        }
    }

    async fn setup() -> (ReviewRepository, BookRepository, i64, i64) {
        let pool = test_support::pool().await;
        let user = test_support::insert_user(&pool, "reader", "reader@example.com").await;
        let books = BookRepository::new(pool.clone());
        let book = books.create(emma()).await.unwrap();
        (ReviewRepository::new(pool), books, user.id, book.id)
    }

    #[tokio::test]
    async fn add_review_updates_book_statistics() {
        let (reviews, books, user, book) = setup().await;

        let created = reviews
            .add(user, &review(book, 4, Some("  Witty  ")))
            .await
            .unwrap();
        assert_eq!(created.rating, 4);
        assert_eq!(created.comment.as_deref(), Some("Witty"));

        let stats = books.get(book).await.unwrap().unwrap();
        assert_eq!(stats.review_count, 1);
        assert_eq!(stats.average_rating, 4.0);

        let listed = reviews.list_for_book(book).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "reader");
    }

    #[tokio::test]
    async fn second_review_conflicts() {
        let (reviews, _, user, book) = setup().await;
        reviews.add(user, &review(book, 5, None)).await.unwrap();

        let err = reviews.add(user, &review(book, 2, None)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref m) if m == ALREADY_REVIEWED));
        assert_eq!(reviews.list_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_rating_and_missing_book_are_rejected() {
        let (reviews, _, user, book) = setup().await;

        assert!(matches!(
            reviews.add(user, &review(book, 6, None)).await,
            Err(RepositoryError::Invalid(_))
        ));
        assert!(matches!(
            reviews.add(user, &review(9_999, 3, None)).await,
            Err(RepositoryError::NotFound("Book"))
        ));
        assert!(reviews.list_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reviews_all_land() {
        let (pool, _dir) = test_support::file_pool().await;
        let readers = test_support::insert_readers(&pool, 30).await;
        let books = BookRepository::new(pool.clone());
        let book = books.create(emma()).await.unwrap().id;
        let reviews = ReviewRepository::new(pool);

        let handles: Vec<_> = readers
            .into_iter()
            .map(|user| {
                let reviews = reviews.clone();
                tokio::spawn(async move { reviews.add(user, &review(book, 4, None)).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = books.get(book).await.unwrap().unwrap();
        assert_eq!(stats.review_count, 30);
        assert_eq!(stats.average_rating, 4.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_reviews_keep_one() {
        let (pool, _dir) = test_support::file_pool().await;
        let user = test_support::insert_readers(&pool, 1).await[0];
        let book = BookRepository::new(pool.clone())
            .create(emma())
            .await
            .unwrap()
            .id;
        let reviews = ReviewRepository::new(pool);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let reviews = reviews.clone();
                tokio::spawn(async move { reviews.add(user, &review(book, 3, None)).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(RepositoryError::Conflict(ref m)) if m == ALREADY_REVIEWED => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(reviews.list_for_user(user).await.unwrap().len(), 1);
    }
}
