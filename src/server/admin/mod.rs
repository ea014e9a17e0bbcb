mod reference;
mod tokens;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // User routes
        .route("/users", post(users::create_user))
        .route("/users", get(users::list_users))
        .route("/users/{uid}", get(users::get_user))
        .route("/users/{uid}/tokens", get(users::list_user_tokens))
        .route("/users/{uid}/tokens", post(users::create_user_token))
        // Token routes
        .route("/tokens", get(tokens::list_tokens))
        .route("/tokens/{id}", get(tokens::get_token))
        .route("/tokens/{id}", delete(tokens::delete_token))
        // Reference tables
        .route("/reference/{table}", post(reference::create_reference_entry))
}
