use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use proofdeck_types::api::{CommentOut, CreateCommentRequest, ToggleReactionRequest};
use proofdeck_types::models::Role;

use crate::AppState;
use crate::access::asset_with_access;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;

pub async fn list_comments(
    State(state): State<AppState>,
    Path(asset_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<CommentOut>>> {
    asset_with_access(&state.db, asset_id, user.id)?;

    // Run the blocking listing (comments + batch reaction fetch) off the
    // async runtime
    let db = Arc::clone(&state);
    let details = tokio::task::spawn_blocking(move || db.db.list_comments(asset_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!(e))
        })??;

    Ok(Json(details.into_iter().map(Into::into).collect()))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(asset_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let (asset, project, _role) = asset_with_access(&state.db, asset_id, user.id)?;

    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Comment content cannot be empty".into()));
    }

    // A reply must point at a comment on the same asset
    if let Some(parent_id) = req.parent_id {
        let parent = state
            .db
            .get_comment(parent_id)?
            .filter(|p| p.asset_id == asset.id);
        if parent.is_none() {
            return Err(ApiError::Validation(
                "Parent comment must be an existing comment on the same asset".into(),
            ));
        }
    }

    let comment = state.db.insert_comment(
        asset.id,
        user.id,
        content,
        req.parent_id,
        project.id,
        user.label(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(CommentOut {
            id: comment.id,
            asset_id: comment.asset_id,
            user_id: comment.user_id,
            content: comment.content,
            parent_id: comment.parent_id,
            created_at: comment.created_at,
            user: user.into(),
            reactions: vec![],
        }),
    ))
}

/// Author or project owner only. Children of the deleted comment stay put
/// as orphan sub-threads.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((asset_id, comment_id)): Path<(i64, i64)>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let (asset, _project, role) = asset_with_access(&state.db, asset_id, user.id)?;

    let comment = state
        .db
        .get_comment(comment_id)?
        .filter(|c| c.asset_id == asset.id)
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;

    if comment.user_id != user.id && role != Role::Owner {
        return Err(ApiError::Forbidden(
            "You are not allowed to delete this comment".into(),
        ));
    }

    state.db.delete_comment(comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Idempotent emoji toggle. Responds with the comment and its current
/// reaction set, whichever direction the toggle went.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path((asset_id, comment_id)): Path<(i64, i64)>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<ToggleReactionRequest>,
) -> ApiResult<Json<CommentOut>> {
    let (asset, project, _role) = asset_with_access(&state.db, asset_id, user.id)?;

    let emoji = req.emoji.trim();
    if emoji.is_empty() {
        return Err(ApiError::Validation("Reaction emoji cannot be empty".into()));
    }

    state
        .db
        .get_comment(comment_id)?
        .filter(|c| c.asset_id == asset.id)
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;

    state
        .db
        .toggle_reaction(comment_id, user.id, emoji, project.id, user.label())?;

    let detail = state
        .db
        .get_comment_detail(comment_id)?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;
    Ok(Json(detail.into()))
}
