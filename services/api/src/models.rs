//! API models for request and response payloads

use serde::Serialize;

pub mod book;
pub mod borrow;
pub mod review;
pub mod user;

pub use book::{Book, BookDetail, BookQuery, BookResponse, BookSummary, NewBook, UpdateBook};
pub use borrow::{BorrowRecord, BorrowRecordResponse, BorrowRequest, BorrowStatus};
pub use review::{BookReview, NewReview, Review};
pub use user::{AuthResponse, LoginRequest, NewUser, Role, SignupRequest, User, UserResponse};

/// The signed-in user's account, loans and reviews
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub borrow_records: Vec<BorrowRecordResponse>,
    pub reviews: Vec<Review>,
}
