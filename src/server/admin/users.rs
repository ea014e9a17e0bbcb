use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{
    CreateTokenRequest, CreateTokenResponse, CreateUserRequest, PaginationParams, TokenResponse,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::{validate_email, validate_uid};
use crate::store::Store;
use crate::types::User;

fn load_user(store: &dyn Store, uid: &str) -> Result<User, ApiError> {
    store
        .get_user_by_uid(uid)
        .api_err("Failed to get user")?
        .or_not_found("User not found")
}

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_uid(&req.uid).map_err(ApiError::bad_request)?;
    validate_email(&req.email).map_err(ApiError::bad_request)?;

    if store.get_user_by_uid(&req.uid).api_err("Failed to check user")?.is_some() {
        return Err(ApiError::conflict("A user with this uid already exists"));
    }
    if store
        .get_user_by_email(&req.email)
        .api_err("Failed to check user")?
        .is_some()
    {
        return Err(ApiError::conflict("A user with this email already exists"));
    }

    let user = store
        .create_user(&req.uid, &req.email, &req.name, &req.surname)
        .api_err("Failed to create user")?;

    tracing::info!("Created user {}", user.uid);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = match params.cursor.as_deref() {
        Some(c) => c
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request("Invalid cursor"))?,
        None => 0,
    };

    let users = state
        .store
        .list_users(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.to_string());

    Ok::<_, ApiError>(Json(ApiResponse::success(PaginatedResponse::new(
        users,
        next_cursor,
        has_more,
    ))))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> impl IntoResponse {
    let user = load_user(state.store.as_ref(), &uid)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(req): Json<CreateTokenRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = load_user(store, &uid)?;

    let expires_at = match req.expires_in_days {
        Some(days) if days <= 0 => {
            return Err(ApiError::bad_request("expires_in_days must be positive"));
        }
        Some(days) => Some(Utc::now() + Duration::days(days)),
        None => None,
    };

    let generator = TokenGenerator::new();
    let (token, raw_token) = generator
        .issue(false, Some(user.id), expires_at)
        .api_err("Failed to generate token")?;

    store.create_token(&token).api_err("Failed to create token")?;
    tracing::info!("Issued token {} for user {}", token.id, user.uid);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: TokenResponse::new(token, Some(user.uid)),
        })),
    ))
}

pub async fn list_user_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = load_user(store, &uid)?;

    let tokens: Vec<TokenResponse> = store
        .list_user_tokens(user.id)
        .api_err("Failed to list tokens")?
        .into_iter()
        .map(|t| TokenResponse::new(t, Some(user.uid.clone())))
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(tokens)))
}
