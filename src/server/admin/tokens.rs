use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{PaginationParams, TokenResponse};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::store::Store;
use crate::types::Token;

fn token_to_response(store: &dyn Store, token: Token) -> Result<TokenResponse, ApiError> {
    let uid = match token.user_id {
        Some(user_id) => store
            .get_user(user_id)
            .api_err("Failed to get token user")?
            .map(|u| u.uid),
        None => None,
    };
    Ok(TokenResponse::new(token, uid))
}

pub async fn list_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let tokens = store
        .list_tokens(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list tokens")?;

    let (tokens, next_cursor, has_more) =
        paginate(tokens, DEFAULT_PAGE_SIZE as usize, |t| t.id.clone());

    let responses = tokens
        .into_iter()
        .map(|t| token_to_response(store, t))
        .collect::<Result<Vec<_>, _>>()?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PaginatedResponse::new(
        responses,
        next_cursor,
        has_more,
    ))))
}

pub async fn get_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let token = store
        .get_token_by_id(&id)
        .api_err("Failed to get token")?
        .or_not_found("Token not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(token_to_response(store, token)?)))
}

pub async fn delete_token(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let token = store
        .get_token_by_id(&id)
        .api_err("Failed to get token")?
        .or_not_found("Token not found")?;

    if token.id == admin.0.id {
        return Err(ApiError::bad_request("Cannot delete current token"));
    }

    store.delete_token(&token.id).api_err("Failed to delete token")?;
    tracing::info!("Revoked token {}", token.id);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
