pub mod access;
pub mod activity;
pub mod assets;
pub mod comments;
pub mod error;
pub mod invites;
pub mod middleware;
pub mod projects;

use std::sync::Arc;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use proofdeck_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// The full API router. Everything except `/health` sits behind bearer
/// authentication.
pub fn router(state: AppState) -> Router {
    let public = Router::new().route("/health", get(health));

    let protected = Router::new()
        .route("/me", get(middleware::me))
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/{project_id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/projects/{project_id}/participants",
            get(projects::list_participants),
        )
        .route(
            "/projects/{project_id}/participants/{user_id}",
            delete(projects::remove_participant),
        )
        .route("/projects/{project_id}/leave", post(projects::leave_project))
        .route("/projects/{project_id}/invites", post(invites::create_invite))
        .route("/invites/pending", get(invites::list_pending))
        .route("/invites/{invite_id}/accept", post(invites::accept_invite))
        .route("/invites/{invite_id}/decline", post(invites::decline_invite))
        .route(
            "/projects/{project_id}/assets",
            get(assets::list_assets).post(assets::upload_asset),
        )
        .route(
            "/projects/{project_id}/assets/{asset_id}",
            delete(assets::delete_asset),
        )
        .route(
            "/assets/{asset_id}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/assets/{asset_id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
        .route(
            "/assets/{asset_id}/comments/{comment_id}/reactions",
            post(comments::toggle_reaction),
        )
        .route("/projects/{project_id}/activity", get(activity::list_activity))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    public.merge(protected)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Convenience for the binary and tests.
pub fn app_state(db: Database, jwt_secret: impl Into<String>) -> AppState {
    Arc::new(AppStateInner {
        db,
        jwt_secret: jwt_secret.into(),
    })
}
