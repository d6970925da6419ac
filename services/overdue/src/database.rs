use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Flag open loans whose due date is before `now`. Returns the number of
    /// records changed.
    pub async fn mark_overdue(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE borrow_records
             SET status = 'overdue'
             WHERE return_date IS NULL
               AND status = 'borrowed'
               AND due_date IS NOT NULL
               AND due_date < ?",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_overdue(&self) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE status = 'overdue' AND return_date IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::Row;

    async fn database() -> Database {
        let pool = common::connect_in_memory().await.unwrap();
        common::schema::apply(&pool).await.unwrap();

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, is_active, created_at)
             VALUES (1, 'reader', 'reader@example.com', 'hash', 'user', 1, ?)",
        )
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

        for id in 1..=4 {
            sqlx::query(
                "INSERT INTO books (id, title, author, isbn, total_copies, available_copies, created_at)
                 VALUES (?, 'Title', 'Author', ?, 2, 1, ?)",
            )
            .bind(id)
            .bind(format!("978000000000{}", id))
            .bind(now)
            .execute(&pool)
            .await
            .unwrap();
        }

        Database::new(pool)
    }

    async fn insert_record(
        db: &Database,
        book_id: i64,
        due_date: Option<DateTime<Utc>>,
        return_date: Option<DateTime<Utc>>,
    ) -> i64 {
        let status = if return_date.is_some() { "returned" } else { "borrowed" };
        sqlx::query_scalar(
            "INSERT INTO borrow_records (user_id, book_id, borrow_date, due_date, return_date, status, fine_amount)
             VALUES (1, ?, ?, ?, ?, ?, 0)
             RETURNING id",
        )
        .bind(book_id)
        .bind(Utc::now() - Duration::days(30))
        .bind(due_date)
        .bind(return_date)
        .bind(status)
        .fetch_one(&db.pool)
        .await
        .unwrap()
    }

    async fn status_of(db: &Database, id: i64) -> String {
        sqlx::query("SELECT status FROM borrow_records WHERE id = ?")
            .bind(id)
            .fetch_one(&db.pool)
            .await
            .unwrap()
            .get("status")
    }

    #[tokio::test]
    async fn only_open_past_due_loans_are_flagged() {
        let db = database().await;
        let now = Utc::now();

        let late = insert_record(&db, 1, Some(now - Duration::days(2)), None).await;
        let on_time = insert_record(&db, 2, Some(now + Duration::days(2)), None).await;
        let returned = insert_record(
            &db,
            3,
            Some(now - Duration::days(2)),
            Some(now - Duration::days(1)),
        )
        .await;
        let undated = insert_record(&db, 4, None, None).await;

        assert_eq!(db.mark_overdue(now).await.unwrap(), 1);

        assert_eq!(status_of(&db, late).await, "overdue");
        assert_eq!(status_of(&db, on_time).await, "borrowed");
        assert_eq!(status_of(&db, returned).await, "returned");
        assert_eq!(status_of(&db, undated).await, "borrowed");
        assert_eq!(db.count_overdue().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sweeping_twice_changes_nothing_new() {
        let db = database().await;
        let now = Utc::now();
        insert_record(&db, 1, Some(now - Duration::hours(1)), None).await;

        assert_eq!(db.mark_overdue(now).await.unwrap(), 1);
        assert_eq!(db.mark_overdue(now).await.unwrap(), 0);
    }
}
