use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::Value;

use crate::auth::{MaybeUser, RequireUser};
use crate::fields::Fields;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::{AccessMode, NewRecord, get_reference_tables};

use super::access::{
    load_step_record, ready_fields, record_matches_step, render_record, require_access,
    require_owner, require_sequence_step, resolve_step, take_id, take_sequence,
};

pub async fn create_step(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(step): Path<String>,
    Json(mut params): Json<Fields>,
) -> impl IntoResponse {
    let user = &auth.user;
    let store = state.store.as_ref();
    let (step, table) = resolve_step(&step)?;

    let record = if table.is_sample() {
        let project_id = take_id(&mut params, "project_id")?;
        if let Some(project_id) = project_id {
            store
                .get_project(project_id)
                .api_err("Failed to get project")?
                .or_not_found("Project not found")?;
        }

        NewRecord {
            table,
            user_id: user.id,
            sequence: None,
            source_id: None,
            project_id,
            fields: ready_fields(params, None)?,
            created: Utc::now(),
        }
    } else {
        let sequence = take_sequence(&mut params)?
            .ok_or_else(|| ApiError::bad_request("sequence is required"))?;
        require_sequence_step(sequence, step)?;

        let source_id = take_id(&mut params, "source_id")?
            .ok_or_else(|| ApiError::bad_request("source_id is required"))?;
        let (parent_step, parent_table) = match (
            step.parent(sequence),
            get_reference_tables(sequence.name(), step.name()),
        ) {
            (Some(parent_step), Some((_, Some(parent_table)))) => (parent_step, parent_table),
            _ => {
                return Err(ApiError::bad_request(format!(
                    "{step} has no parent in {sequence}"
                )));
            }
        };

        let parent = store
            .get_record(parent_table, source_id)
            .api_err("Failed to get parent record")?
            .or_not_found("Parent record not found")?;
        if parent
            .sequence
            .as_deref()
            .is_some_and(|s| s != sequence.name())
        {
            return Err(ApiError::bad_request(format!(
                "Parent record does not belong to {sequence}"
            )));
        }
        require_access(store, parent_step, &parent, Some(user.id), AccessMode::ReadWrite)?;

        NewRecord {
            table,
            user_id: user.id,
            sequence: Some(sequence),
            source_id: Some(source_id),
            project_id: None,
            fields: ready_fields(params, Some((sequence, step)))?,
            created: Utc::now(),
        }
    };

    let created = store.create_record(&record).api_err("Failed to create record")?;
    tracing::info!("User {} created {} {}", user.uid, table, created.id);

    let mut rendered = render_record(store, &created)?;
    rendered.insert("access_mode".to_string(), Value::from(AccessMode::ReadWrite.as_str()));

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(rendered))))
}

pub async fn get_step(
    auth: MaybeUser,
    State(state): State<Arc<AppState>>,
    Path((step, id)): Path<(String, i64)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let (step, table) = resolve_step(&step)?;

    let record = load_step_record(store, step, table, id)?;
    let mode = require_access(store, step, &record, auth.user_id(), AccessMode::Read)?;

    let mut rendered = render_record(store, &record)?;
    rendered.insert("access_mode".to_string(), Value::from(mode.as_str()));

    Ok::<_, ApiError>(Json(ApiResponse::success(rendered)))
}

pub async fn update_step(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id)): Path<(String, i64)>,
    Json(mut params): Json<Fields>,
) -> impl IntoResponse {
    let user = &auth.user;
    let store = state.store.as_ref();
    let (step, table) = resolve_step(&step)?;

    let record = load_step_record(store, step, table, id)?;
    let mode = require_access(store, step, &record, Some(user.id), AccessMode::ReadWrite)?;

    let target = if table.is_sample() {
        None
    } else {
        let sequence = take_sequence(&mut params)?
            .ok_or_else(|| ApiError::bad_request("sequence is required"))?;
        require_sequence_step(sequence, step)?;
        if record.sequence.as_deref() != Some(sequence.name()) {
            return Err(ApiError::bad_request(format!(
                "Record does not belong to {sequence}"
            )));
        }
        Some((sequence, step))
    };

    let fields = ready_fields(params, target)?;
    let record = store
        .merge_record_fields(table, id, &fields, Utc::now())
        .api_err("Failed to update record")?;

    let mut rendered = render_record(store, &record)?;
    rendered.insert("access_mode".to_string(), Value::from(mode.as_str()));

    Ok::<_, ApiError>(Json(ApiResponse::success(rendered)))
}

pub async fn delete_step(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((step, id)): Path<(String, i64)>,
) -> impl IntoResponse {
    let user = &auth.user;
    let store = state.store.as_ref();
    let (step, table) = resolve_step(&step)?;

    let record = load_step_record(store, step, table, id)?;
    require_owner(user, &record)?;

    let children = store
        .count_child_records(table, id)
        .api_err("Failed to count child records")?;
    if children > 0 {
        return Err(ApiError::conflict(format!(
            "Record has {children} child record(s) and cannot be deleted"
        )));
    }

    store.delete_record(table, id).api_err("Failed to delete record")?;
    tracing::info!("User {} deleted {} {}", user.uid, table, id);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_public(
    State(state): State<Arc<AppState>>,
    Path(step): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let (step, table) = resolve_step(&step)?;

    let records = store
        .list_visible_records(table, None)
        .api_err("Failed to list public records")?;

    let ids: Vec<i64> = records
        .into_iter()
        .filter(|r| record_matches_step(r, step))
        .map(|r| r.id)
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(ids)))
}
