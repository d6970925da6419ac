//! API service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    extractors::{ValidId, ValidJson, ValidQuery},
    middleware::{AuthUser, auth_middleware},
    models::{
        AuthResponse, BookDetail, BookQuery, BookResponse, BorrowRecordResponse, BorrowRequest,
        LoginRequest, NewBook, NewReview, NewUser, ProfileResponse, Role, SignupRequest,
        UpdateBook, User, UserResponse,
    },
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/books", post(create_book))
        .route("/api/books/:id", put(update_book).delete(delete_book))
        .route("/api/borrow", post(borrow_book))
        .route("/api/borrow/:id", put(return_book))
        .route("/api/reviews", post(add_review))
        .route("/api/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/books", get(list_books))
        .route("/api/books/:id", get(get_book))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    if !common::health_check(&state.db_pool).await? {
        return Err(ApiError::Internal("Database health check failed".to_string()));
    }

    Ok(Json(json!({
        "status": "ok",
        "service": "library-api"
    })))
}

fn issue_token(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let token = state
        .jwt_service
        .generate_access_token(user.id, user.role.as_str())?;

    Ok(AuthResponse {
        token,
        user: UserResponse::from(user),
    })
}

/// Register a new reader account
pub async fn signup(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    auth::validate_username(username)?;
    auth::validate_email(email)?;
    auth::validate_password(&payload.password)?;

    if state.user_repository.find_by_email(email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }
    if state
        .user_repository
        .find_by_username(username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    let user = state
        .user_repository
        .create(&NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: auth::hash_password(&payload.password)?,
            role: Role::User,
        })
        .await?;

    info!("New account registered: {}", user.username);
    Ok((StatusCode::CREATED, Json(issue_token(&state, user)?)))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = state
        .user_repository
        .find_by_email(payload.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active || !auth::verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    Ok(Json(issue_token(&state, user)?))
}

/// List the catalog
pub async fn list_books(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<BookQuery>,
) -> ApiResult<impl IntoResponse> {
    let books: Vec<BookResponse> = state
        .book_repository
        .list(&query)
        .await?
        .into_iter()
        .map(BookResponse::from)
        .collect();

    Ok(Json(books))
}

/// Get a book with its reviews
pub async fn get_book(
    State(state): State<AppState>,
    ValidId(id): ValidId,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .book_repository
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;
    let reviews = state.review_repository.list_for_book(id).await?;

    Ok(Json(BookDetail {
        book: book.into(),
        reviews,
    }))
}

pub async fn create_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(payload): ValidJson<NewBook>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin()?;

    let book = state.book_repository.create(payload).await?;
    info!("{} added book {}", auth.username, book.id);

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

pub async fn update_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidId(id): ValidId,
    ValidJson(payload): ValidJson<UpdateBook>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin()?;

    let book = state.book_repository.update(id, payload).await?;

    Ok(Json(BookResponse::from(book)))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidId(id): ValidId,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin()?;

    state.book_repository.delete(id).await?;
    info!("{} deleted book {}", auth.username, id);

    Ok(Json(json!({"message": "Book deleted successfully"})))
}

/// Borrow a copy of a book
pub async fn borrow_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(payload): ValidJson<BorrowRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .borrow_repository
        .borrow(auth.id, payload.book_id)
        .await?;

    Ok((StatusCode::CREATED, Json(BorrowRecordResponse::from(record))))
}

/// Return a borrowed book
pub async fn return_book(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidId(id): ValidId,
) -> ApiResult<impl IntoResponse> {
    let record = state.borrow_repository.return_book(id, auth.id).await?;

    Ok(Json(BorrowRecordResponse::from(record)))
}

/// Review a book
pub async fn add_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(payload): ValidJson<NewReview>,
) -> ApiResult<impl IntoResponse> {
    let review = state.review_repository.add(auth.id, &payload).await?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// The signed-in user's account, loans and reviews
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let now = Utc::now();
    let borrow_records = state
        .borrow_repository
        .list_for_user(auth.id)
        .await?
        .into_iter()
        .map(|(record, book)| BorrowRecordResponse::new(record, Some(book), now))
        .collect();
    let reviews = state.review_repository.list_for_user(auth.id).await?;

    Ok(Json(ProfileResponse {
        user: user.into(),
        borrow_records,
        reviews,
    }))
}
