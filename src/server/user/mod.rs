pub mod access;
mod groups;
mod lists;
mod profile;
mod projects;
mod sharing;
mod steps;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Own profile
        .route(
            "/users/me",
            get(profile::get_profile)
                .patch(profile::update_profile)
                .delete(profile::delete_profile),
        )
        // Groups
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/{id}",
            get(groups::get_group)
                .patch(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/groups/{id}/members", get(groups::list_members))
        .route("/groups/{id}/invitations", post(groups::invite_member))
        .route(
            "/groups/{id}/invitation",
            get(groups::get_group)
                .put(groups::accept_invitation)
                .delete(groups::reject_invitation),
        )
        .route("/groups/{id}/leave", post(groups::leave_group))
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/own", get(projects::list_own_projects))
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        // Listings
        .route("/public/{step}", get(steps::list_public))
        .route("/user/list/{table}", get(lists::list_user_table))
        // Samples and omic sequence steps
        .route("/{step}", post(steps::create_step))
        .route(
            "/{step}/{id}",
            get(steps::get_step)
                .patch(steps::update_step)
                .put(steps::update_step)
                .delete(steps::delete_step),
        )
        .route("/{step}/{id}/share", get(sharing::get_sharings))
        .route(
            "/{step}/{id}/share/public",
            delete(sharing::unshare_public)
                .put(sharing::share_public)
                .patch(sharing::share_public),
        )
        .route(
            "/{step}/{id}/share/user",
            post(sharing::share_user)
                .put(sharing::share_user)
                .patch(sharing::share_user),
        )
        .route("/{step}/{id}/share/user/{user_uuid}", delete(sharing::unshare_user))
        .route(
            "/{step}/{id}/share/group",
            post(sharing::share_group)
                .put(sharing::share_group)
                .patch(sharing::share_group),
        )
        .route("/{step}/{id}/share/group/{group_id}", delete(sharing::unshare_group))
}
