//! Fixtures shared by the unit and router tests

use auth::{JwtConfig, JwtService, hash_password};
use chrono::Duration;
use common::DatabaseConfig;
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::{
    models::{NewUser, Role, User},
    repositories::{BookRepository, BorrowRepository, ReviewRepository, UserRepository},
    state::AppState,
};

pub const PASSWORD: &str = "password123";

/// Fresh in-memory database with the schema applied
pub async fn pool() -> SqlitePool {
    let pool = common::connect_in_memory().await.unwrap();
    common::schema::apply(&pool).await.unwrap();
    pool
}

/// Database file shared by several pooled connections, for tests that race
/// writers against each other. The file is removed when the directory guard
/// is dropped.
pub async fn file_pool() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}", dir.path().join("library.db").display()),
        max_connections: 16,
        min_connections: 1,
        connection_timeout: 30,
    };
    let pool = common::init_pool(&config).await.unwrap();
    common::schema::apply(&pool).await.unwrap();
    (pool, dir)
}

/// `count` regular accounts that never log in, so no password is hashed
pub async fn insert_readers(pool: &SqlitePool, count: usize) -> Vec<i64> {
    let users = UserRepository::new(pool.clone());
    let mut ids = Vec::with_capacity(count);
    for n in 0..count {
        let user = users
            .create(&NewUser {
                username: format!("reader{}", n),
                email: format!("reader{}@example.com", n),
                password_hash: "unused".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        ids.push(user.id);
    }
    ids
}

async fn insert(pool: &SqlitePool, username: &str, email: &str, role: Role) -> User {
    UserRepository::new(pool.clone())
        .create(&NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
            role,
        })
        .await
        .unwrap()
}

/// Regular account whose password is [`PASSWORD`]
pub async fn insert_user(pool: &SqlitePool, username: &str, email: &str) -> User {
    insert(pool, username, email, Role::User).await
}

pub async fn insert_admin(pool: &SqlitePool, username: &str, email: &str) -> User {
    insert(pool, username, email, Role::Admin).await
}

pub async fn app_state() -> AppState {
    let pool = pool().await;
    AppState {
        jwt_service: JwtService::new(JwtConfig::with_secret("test-secret")).unwrap(),
        user_repository: UserRepository::new(pool.clone()),
        book_repository: BookRepository::new(pool.clone()),
        borrow_repository: BorrowRepository::new(pool.clone(), Duration::days(14)),
        review_repository: ReviewRepository::new(pool.clone()),
        db_pool: pool,
    }
}

pub fn token_for(state: &AppState, user: &User) -> String {
    state
        .jwt_service
        .generate_access_token(user.id, user.role.as_str())
        .unwrap()
}
