//! Review models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Review entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review shown on a book page, with the reviewer's username
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookReview {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "user")]
    pub username: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request for review submission
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub book_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
}

impl NewReview {
    pub fn validate_rating(&self) -> Result<(), String> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            ));
        }
        Ok(())
    }

    /// Blank comments are stored as absent
    pub fn comment(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
