//! Book catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::review::BookReview;

/// Catalog entry with its aggregated review statistics
#[derive(Debug, Clone, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: i64,
    pub available_copies: i64,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub average_rating: f64,
    pub review_count: i64,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

/// Book as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: i64,
    pub available_copies: i64,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub image_url: Option<String>,
    pub average_rating: f64,
    pub review_count: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        let is_available = book.is_available();
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            description: book.description,
            publication_year: book.publication_year,
            genre: book.genre,
            image_url: book.image_url,
            average_rating: book.average_rating,
            review_count: book.review_count,
            is_available,
            created_at: book.created_at,
        }
    }
}

/// Single book with its reviews
#[derive(Debug, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: BookResponse,
    pub reviews: Vec<BookReview>,
}

/// Minimal book reference embedded in borrow records
#[derive(Debug, Clone, Serialize)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
}

/// Request for book creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: Option<i64>,
    pub available_copies: Option<i64>,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub image_url: Option<String>,
}

impl NewBook {
    /// Trim and check the payload, filling in copy defaults: one copy, all
    /// of them on the shelf.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.title = required("Title", &self.title)?;
        self.author = required("Author", &self.author)?;
        self.isbn = normalize_isbn(&self.isbn)?;

        let total = self.total_copies.unwrap_or(1);
        let available = self.available_copies.unwrap_or(total);
        validate_copies(total, available)?;
        self.total_copies = Some(total);
        self.available_copies = Some(available);

        Ok(self)
    }
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: Option<i64>,
    pub available_copies: Option<i64>,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub image_url: Option<String>,
}

impl UpdateBook {
    /// Merge this update over the stored book.
    ///
    /// Changing `total_copies` without naming `available_copies` shifts the
    /// shelf count by the same amount, so copies on loan stay on loan.
    pub fn merge(self, current: &Book) -> Result<NewBook, String> {
        let total = self.total_copies.unwrap_or(current.total_copies);
        let available = match self.available_copies {
            Some(available) => available,
            None => total
                .checked_sub(current.total_copies)
                .and_then(|delta| current.available_copies.checked_add(delta))
                .ok_or_else(|| "total_copies is out of range".to_string())?,
        };

        NewBook {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            author: self.author.unwrap_or_else(|| current.author.clone()),
            isbn: self.isbn.unwrap_or_else(|| current.isbn.clone()),
            total_copies: Some(total),
            available_copies: Some(available),
            description: self.description.or_else(|| current.description.clone()),
            publication_year: self.publication_year.or(current.publication_year),
            genre: self.genre.or_else(|| current.genre.clone()),
            image_url: self.image_url.or_else(|| current.image_url.clone()),
        }
        .normalized()
    }
}

/// Query parameters for the catalog listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    /// Page number (1-based); only used together with `limit`
    pub page: Option<u32>,
    /// Number of books per page; all books when absent
    pub limit: Option<u32>,
    /// Exact genre match
    pub genre: Option<String>,
    /// Case-insensitive substring of title or author
    pub search: Option<String>,
}

impl BookQuery {
    pub const MAX_LIMIT: u32 = 100;

    /// `(limit, offset)` when pagination was requested
    pub fn window(&self) -> Option<(i64, i64)> {
        let limit = self.limit?.clamp(1, Self::MAX_LIMIT) as i64;
        let page = self.page.unwrap_or(1).max(1) as i64;
        Some((limit, (page - 1) * limit))
    }
}

fn required(field: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(trimmed.to_string())
}

/// ISBN-10 or ISBN-13, hyphens and spaces removed
fn normalize_isbn(raw: &str) -> Result<String, String> {
    let isbn: String = raw.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect();
    if isbn.is_empty() {
        return Err("ISBN is required".to_string());
    }

    let valid = match isbn.len() {
        13 => isbn.chars().all(|c| c.is_ascii_digit()),
        10 => {
            let (body, check) = isbn.split_at(9);
            body.chars().all(|c| c.is_ascii_digit())
                && check.chars().all(|c| c.is_ascii_digit() || c == 'X' || c == 'x')
        }
        _ => false,
    };

    if !valid {
        return Err("ISBN must be 10 or 13 digits".to_string());
    }
    Ok(isbn.to_ascii_uppercase())
}

pub fn validate_copies(total: i64, available: i64) -> Result<(), String> {
    if total < 0 {
        return Err("total_copies cannot be negative".to_string());
    }
    if available < 0 {
        return Err("available_copies cannot be negative".to_string());
    }
    if available > total {
        return Err("available_copies cannot exceed total_copies".to_string());
    }
    Ok(())
}
