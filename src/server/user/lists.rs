use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::Value;

use crate::access::availability;
use crate::auth::MaybeUser;
use crate::fields::{Fields, merge_extra_fields};
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::SequenceStep;

use super::access::{record_matches_step, render_record};

/// Lists what the caller can see in `table`: their groups, their
/// projects, or the rows of a step annotated with how each one is
/// available to them.
pub async fn list_user_table(
    auth: MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let data = match table.as_str() {
        "groups" | "projects" => {
            let user = auth
                .0
                .as_ref()
                .ok_or_else(|| ApiError::forbidden("User token required for this operation"))?;
            let listed = if table == "groups" {
                serde_json::to_value(store.list_user_groups(user.id).api_err("Failed to list groups")?)
            } else {
                serde_json::to_value(
                    store
                        .list_user_projects(user.id)
                        .api_err("Failed to list projects")?,
                )
            };
            listed.map_err(|_| ApiError::internal("Failed to encode list"))?
        }
        name => {
            let step = SequenceStep::parse(name)
                .ok_or_else(|| ApiError::not_found(format!("Unknown table '{name}'")))?;
            let table = step
                .table()
                .ok_or_else(|| ApiError::not_found(format!("Unknown table '{name}'")))?;

            let records = store
                .list_visible_records(table, auth.user_id())
                .api_err("Failed to list records")?;

            let mut rows: Vec<Fields> = Vec::with_capacity(records.len());
            for record in records.iter().filter(|r| record_matches_step(r, step)) {
                let Some(found) =
                    availability(store, record, auth.user_id()).api_err("Failed to resolve access")?
                else {
                    continue;
                };
                let rendered = render_record(store, record)?;
                rows.push(merge_extra_fields(rendered, &found).api_err("Failed to encode record")?);
            }
            Value::Array(rows.into_iter().map(Value::Object).collect())
        }
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(data)))
}
