use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateProjectRequest, UpdateProjectRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_project_name;
use crate::store::Store;
use crate::types::{Project, User};

fn load_project(store: &dyn Store, id: i64) -> Result<Project, ApiError> {
    store
        .get_project(id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")
}

fn require_project_member(store: &dyn Store, user: &User, project_id: i64) -> Result<(), ApiError> {
    if !store
        .is_project_member(user.id, project_id)
        .api_err("Failed to check project membership")?
    {
        return Err(ApiError::forbidden("Not linked to this project"));
    }
    Ok(())
}

pub async fn list_projects(_auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let projects = state.store.list_projects().api_err("Failed to list projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn list_own_projects(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let projects = state
        .store
        .list_user_projects(auth.user.id)
        .api_err("Failed to list projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn get_project(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let project = load_project(state.store.as_ref(), id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(project)))
}

pub async fn create_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_project_name(&req.name)?;

    if store
        .get_project_by_name(&req.name)
        .api_err("Failed to check project")?
        .is_some()
    {
        return Err(ApiError::conflict("Project name already exists"));
    }

    let project = store
        .create_project(&req.name, req.description.as_deref(), auth.user.id)
        .api_err("Failed to create project")?;

    tracing::info!("User {} created project {}", auth.user.uid, project.name);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn update_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProjectRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut project = load_project(store, id)?;
    require_project_member(store, &auth.user, id)?;

    if let Some(name) = req.name {
        validate_project_name(&name)?;

        if name != project.name
            && store
                .get_project_by_name(&name)
                .api_err("Failed to check project name")?
                .is_some()
        {
            return Err(ApiError::conflict("Project name already exists"));
        }
        project.name = name;
    }
    if let Some(description) = req.description {
        project.description = Some(description);
    }
    project.updated_at = Utc::now();

    store.update_project(&project).api_err("Failed to update project")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(project)))
}

pub async fn delete_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, id)?;
    require_project_member(store, &auth.user, id)?;

    let samples = store
        .count_project_samples(id)
        .api_err("Failed to count project samples")?;
    if samples > 0 {
        return Err(ApiError::conflict(format!(
            "Project has {samples} sample(s) and cannot be deleted"
        )));
    }

    store.delete_project(id).api_err("Failed to delete project")?;
    tracing::info!("User {} deleted project {}", auth.user.uid, project.name);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
