use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::CreateReferenceRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::ReferenceTable;

/// Adds a row to a description table, e.g. a keyword or a publication.
pub async fn create_reference_entry(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Json(req): Json<CreateReferenceRequest>,
) -> impl IntoResponse {
    let table = ReferenceTable::parse(&table)
        .ok_or_else(|| ApiError::not_found(format!("Unknown reference table '{table}'")))?;

    let description = req.description.trim();
    if description.is_empty() {
        return Err(ApiError::bad_request("description cannot be empty"));
    }

    let entry = state
        .store
        .create_reference_entry(table, description)
        .api_err("Failed to create reference row")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(entry))))
}
