//! Catalogue and reference queries. Open to anonymous callers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde_json::Value;

use crate::server::AppState;
use crate::server::dto::{ClassifyResponse, SequenceResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::{OmicSequence, QueryTable};

pub fn general_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sequences", get(list_sequences))
        .route("/query/sequence/{name}", get(get_sequence))
        .route("/query/{table}", get(query_table))
        .route("/query/{table}/{value}", get(classify_value))
}

async fn list_sequences() -> impl IntoResponse {
    let sequences: Vec<SequenceResponse> = OmicSequence::ALL.into_iter().map(Into::into).collect();
    Json(ApiResponse::success(sequences))
}

async fn get_sequence(Path(name): Path<String>) -> impl IntoResponse {
    let sequence = OmicSequence::parse(&name)
        .ok_or_else(|| ApiError::not_found(format!("Unknown sequence '{name}'")))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(SequenceResponse::from(sequence))))
}

async fn query_table(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let rows = match QueryTable::parse(&table) {
        Some(QueryTable::Range(range)) => serde_json::to_value(
            store
                .list_range_entries(range)
                .api_err("Failed to list reference rows")?,
        ),
        Some(QueryTable::Reference(reference)) => serde_json::to_value(
            store
                .list_reference_entries(reference)
                .api_err("Failed to list reference rows")?,
        ),
        None => return Err(ApiError::not_found(format!("Unknown table '{table}'"))),
    }
    .map_err(|_| ApiError::internal("Failed to encode reference rows"))?;

    Ok::<_, ApiError>(Json(ApiResponse::<Value>::success(rows)))
}

async fn classify_value(
    State(state): State<Arc<AppState>>,
    Path((table, value)): Path<(String, String)>,
) -> impl IntoResponse {
    let Some(QueryTable::Range(range)) = QueryTable::parse(&table) else {
        return Err(ApiError::not_found(format!("'{table}' is not a range table")));
    };

    let value: f64 = value
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| ApiError::bad_request(format!("'{value}' is not a number")))?;

    let entries = state
        .store
        .list_range_entries(range)
        .api_err("Failed to list reference rows")?;

    let description = crate::fields::classify(&entries, value);

    Ok::<_, ApiError>(Json(ApiResponse::success(ClassifyResponse {
        value,
        description,
    })))
}
