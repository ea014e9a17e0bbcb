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
use crate::server::dto::{CreateGroupRequest, InviteRequest, UpdateGroupRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_group_name;
use crate::store::Store;
use crate::types::{Group, GroupMember, GroupRelation, GroupWithRelation, Membership, User};

fn load_group(store: &dyn Store, id: i64) -> Result<Group, ApiError> {
    store
        .get_group(id)
        .api_err("Failed to get group")?
        .or_not_found("Group not found")
}

fn relation_of(store: &dyn Store, user: &User, group_id: i64) -> Result<Option<GroupRelation>, ApiError> {
    Ok(store
        .get_membership(user.id, group_id)
        .api_err("Failed to get membership")?
        .map(|m| m.relation))
}

fn require_group_owner(store: &dyn Store, user: &User, group_id: i64) -> Result<(), ApiError> {
    match relation_of(store, user, group_id)? {
        Some(GroupRelation::Owner) => Ok(()),
        _ => Err(ApiError::forbidden("Only the group owner can do this")),
    }
}

pub async fn create_group(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGroupRequest>,
) -> impl IntoResponse {
    let user = &auth.user;
    let store = state.store.as_ref();

    validate_group_name(&req.name)?;

    if store
        .get_group_by_name(&req.name)
        .api_err("Failed to check group")?
        .is_some()
    {
        return Err(ApiError::conflict("Group name already exists"));
    }

    let group = store
        .create_group(&req.name, req.description.as_deref(), user.id)
        .api_err("Failed to create group")?;

    tracing::info!("User {} created group {}", user.uid, group.name);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(GroupWithRelation {
            group,
            relation: GroupRelation::Owner,
        })),
    ))
}

pub async fn list_groups(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let groups = state
        .store
        .list_user_groups(auth.user.id)
        .api_err("Failed to list groups")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(groups)))
}

pub async fn get_group(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let group = load_group(store, id)?;

    let relation = relation_of(store, &auth.user, id)?
        .ok_or_else(|| ApiError::forbidden("Not a member of this group"))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(GroupWithRelation { group, relation })))
}

pub async fn update_group(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGroupRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut group = load_group(store, id)?;
    require_group_owner(store, &auth.user, id)?;

    if let Some(name) = req.name {
        validate_group_name(&name)?;

        if name != group.name
            && store
                .get_group_by_name(&name)
                .api_err("Failed to check group name")?
                .is_some()
        {
            return Err(ApiError::conflict("Group name already exists"));
        }
        group.name = name;
    }
    if let Some(description) = req.description {
        group.description = Some(description);
    }
    group.updated_at = Utc::now();

    store.update_group(&group).api_err("Failed to update group")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(GroupWithRelation {
        group,
        relation: GroupRelation::Owner,
    })))
}

pub async fn delete_group(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let group = load_group(store, id)?;
    require_group_owner(store, &auth.user, id)?;

    store.delete_group(id).api_err("Failed to delete group")?;
    tracing::info!("User {} deleted group {}", auth.user.uid, group.name);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn invite_member(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<InviteRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    load_group(store, id)?;
    require_group_owner(store, &auth.user, id)?;

    let invitee = store
        .get_user_by_uid(&req.user_uuid)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if relation_of(store, &invitee, id)?.is_some() {
        return Err(ApiError::conflict("User is already a member or invited"));
    }

    store
        .upsert_membership(&Membership {
            user_id: invitee.id,
            group_id: id,
            relation: GroupRelation::Invited,
            addition_date: None,
        })
        .api_err("Failed to invite user")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(GroupMember {
            uid: invitee.uid,
            name: invitee.name,
            surname: invitee.surname,
            relation: GroupRelation::Invited,
            addition_date: None,
        })),
    ))
}

pub async fn accept_invitation(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let group = load_group(store, id)?;

    if relation_of(store, &auth.user, id)? != Some(GroupRelation::Invited) {
        return Err(ApiError::not_found("No pending invitation for this group"));
    }

    store
        .upsert_membership(&Membership {
            user_id: auth.user.id,
            group_id: id,
            relation: GroupRelation::Member,
            addition_date: Some(Utc::now()),
        })
        .api_err("Failed to accept invitation")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(GroupWithRelation {
        group,
        relation: GroupRelation::Member,
    })))
}

pub async fn reject_invitation(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    load_group(store, id)?;

    if relation_of(store, &auth.user, id)? != Some(GroupRelation::Invited) {
        return Err(ApiError::not_found("No pending invitation for this group"));
    }

    store
        .delete_membership(auth.user.id, id)
        .api_err("Failed to reject invitation")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    load_group(store, id)?;

    if !relation_of(store, &auth.user, id)?.is_some_and(GroupRelation::is_active) {
        return Err(ApiError::forbidden("Not a member of this group"));
    }

    let members = store
        .list_group_members(id)
        .api_err("Failed to list members")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(members)))
}

pub async fn leave_group(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    load_group(store, id)?;

    match relation_of(store, &auth.user, id)? {
        Some(GroupRelation::Member) => {}
        Some(GroupRelation::Owner) => {
            return Err(ApiError::bad_request("The owner cannot leave the group"));
        }
        Some(GroupRelation::Invited) | None => {
            return Err(ApiError::not_found("Not a member of this group"));
        }
    }

    store
        .delete_membership(auth.user.id, id)
        .api_err("Failed to leave group")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
