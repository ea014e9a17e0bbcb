use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::UpdateProfileRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_email;

pub async fn get_profile(auth: RequireUser) -> impl IntoResponse {
    Json(ApiResponse::success(auth.user))
}

pub async fn update_profile(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut user = auth.user;

    if let Some(email) = req.email {
        validate_email(&email).map_err(ApiError::bad_request)?;

        if store
            .get_user_by_email(&email)
            .api_err("Failed to check email")?
            .is_some_and(|other| other.id != user.id)
        {
            return Err(ApiError::conflict("Email already in use"));
        }
        user.email = email;
    }
    if let Some(name) = req.name {
        user.name = name;
    }
    if let Some(surname) = req.surname {
        user.surname = surname;
    }
    user.updated_at = Utc::now();

    store.update_user(&user).api_err("Failed to update user")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn delete_profile(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.as_ref();

    let owned = store
        .count_user_records(auth.user.id)
        .api_err("Failed to count records")?;
    if owned > 0 {
        return Err(ApiError::conflict(format!(
            "User still owns {owned} record(s)"
        )));
    }

    store.delete_user(auth.user.id).api_err("Failed to delete user")?;
    tracing::info!("User {} deleted their account", auth.user.uid);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
