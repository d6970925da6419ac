//! Borrow record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::book::BookSummary;

/// Loan state as stored. `overdue` is written by the overdue sweep; reads
/// also derive it on the fly through [`BorrowRecord::is_overdue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BorrowStatus {
    Borrowed,
    Returned,
    Overdue,
}

/// Borrow record entity
#[derive(Debug, Clone, FromRow)]
pub struct BorrowRecord {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub fine_amount: f64,
}

impl BorrowRecord {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match (self.return_date, self.due_date) {
            (None, Some(due)) => now > due,
            _ => false,
        }
    }

    /// Whole days on loan, up to the return date or `now` while open
    pub fn days_borrowed(&self, now: DateTime<Utc>) -> i64 {
        let end = self.return_date.unwrap_or(now);
        (end - self.borrow_date).num_days()
    }
}

/// Borrow record as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct BorrowRecordResponse {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub fine_amount: f64,
    pub is_overdue: bool,
    pub days_borrowed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookSummary>,
}

impl BorrowRecordResponse {
    pub fn new(record: BorrowRecord, book: Option<BookSummary>, now: DateTime<Utc>) -> Self {
        Self {
            is_overdue: record.is_overdue(now),
            days_borrowed: record.days_borrowed(now),
            id: record.id,
            user_id: record.user_id,
            book_id: record.book_id,
            borrow_date: record.borrow_date,
            due_date: record.due_date,
            return_date: record.return_date,
            status: record.status,
            fine_amount: record.fine_amount,
            book,
        }
    }
}

impl From<BorrowRecord> for BorrowRecordResponse {
    fn from(record: BorrowRecord) -> Self {
        Self::new(record, None, Utc::now())
    }
}

/// Request for borrowing a book
#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub book_id: i64,
}
