use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ShareGroupRequest, ShareUserRequest, SharingsResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{AccessMode, StepRecord, StepTable};

use super::access::{load_record, load_step_record, require_owner, resolve_step};

fn sharings(store: &dyn Store, table: StepTable, id: i64) -> Result<SharingsResponse, ApiError> {
    let record = load_record(store, table, id)?;
    Ok(SharingsResponse {
        is_public: record.is_public,
        users: store
            .list_user_sharings(table, id)
            .api_err("Failed to list user sharings")?,
        groups: store
            .list_group_sharings(table, id)
            .api_err("Failed to list group sharings")?,
    })
}

/// Loads the record addressed by the path and checks the caller owns it.
fn owned_record(
    store: &dyn Store,
    auth: &RequireUser,
    step: &str,
    id: i64,
) -> Result<StepRecord, ApiError> {
    let (step, table) = resolve_step(step)?;
    let record = load_step_record(store, step, table, id)?;
    require_owner(&auth.user, &record)?;
    Ok(record)
}

pub async fn get_sharings(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id)): Path<(String, i64)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let record = owned_record(store, &auth, &step, id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sharings(store, record.table, id)?)))
}

pub async fn share_public(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id)): Path<(String, i64)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let record = owned_record(store, &auth, &step, id)?;

    store
        .set_record_public(record.table, id, true)
        .api_err("Failed to publish record")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sharings(store, record.table, id)?)))
}

pub async fn unshare_public(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id)): Path<(String, i64)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let record = owned_record(store, &auth, &step, id)?;

    store
        .set_record_public(record.table, id, false)
        .api_err("Failed to unpublish record")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sharings(store, record.table, id)?)))
}

pub async fn share_user(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id)): Path<(String, i64)>,
    Json(req): Json<ShareUserRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let record = owned_record(store, &auth, &step, id)?;

    let target = store
        .get_user_by_uid(&req.user_uuid)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;
    if target.id == record.user_id {
        return Err(ApiError::bad_request("Cannot share a record with its owner"));
    }

    store
        .upsert_user_sharing(record.table, id, target.id, AccessMode::from_readwrite(req.readwrite))
        .api_err("Failed to share record")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sharings(store, record.table, id)?)))
}

pub async fn unshare_user(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id, user_uuid)): Path<(String, i64, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let record = owned_record(store, &auth, &step, id)?;

    let target = store
        .get_user_by_uid(&user_uuid)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if !store
        .delete_user_sharing(record.table, id, target.id)
        .api_err("Failed to remove sharing")?
    {
        return Err(ApiError::not_found("Sharing not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn share_group(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id)): Path<(String, i64)>,
    Json(req): Json<ShareGroupRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let record = owned_record(store, &auth, &step, id)?;

    store
        .get_group(req.group_id)
        .api_err("Failed to get group")?
        .or_not_found("Group not found")?;

    store
        .upsert_group_sharing(record.table, id, req.group_id, AccessMode::from_readwrite(req.readwrite))
        .api_err("Failed to share record")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sharings(store, record.table, id)?)))
}

pub async fn unshare_group(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id, group_id)): Path<(String, i64, i64)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let record = owned_record(store, &auth, &step, id)?;

    if !store
        .delete_group_sharing(record.table, id, group_id)
        .api_err("Failed to remove sharing")?
    {
        return Err(ApiError::not_found("Sharing not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
