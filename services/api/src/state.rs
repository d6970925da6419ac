//! Application state shared across handlers

use auth::JwtService;
use sqlx::SqlitePool;

use crate::repositories::{BookRepository, BorrowRepository, ReviewRepository, UserRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub book_repository: BookRepository,
    pub borrow_repository: BorrowRepository,
    pub review_repository: ReviewRepository,
}
