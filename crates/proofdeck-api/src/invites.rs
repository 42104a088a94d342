use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use proofdeck_types::api::{CreateInviteRequest, InviteDetailOut, InviteOut};

use crate::AppState;
use crate::access::ensure_owner;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;

/// Project owner invites a user by email. The invite sits as `pending`
/// until the addressee accepts or declines.
pub async fn create_invite(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateInviteRequest>,
) -> ApiResult<impl IntoResponse> {
    let project = ensure_owner(&state.db, project_id, user.id)?;

    let invited_email = req.invited_email.trim().to_lowercase();
    if invited_email.is_empty() {
        return Err(ApiError::Validation("Invited email cannot be empty".into()));
    }
    if invited_email == user.email {
        return Err(ApiError::Validation("You cannot invite yourself.".into()));
    }

    let invite = state
        .db
        .create_invite(project.id, &invited_email, user.id)?;
    Ok((StatusCode::CREATED, Json(InviteOut::from(invite))))
}

/// Notifications endpoint: pending invites addressed to the caller, matched
/// by linked user id or — for invites that predate the account — by email.
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<InviteDetailOut>>> {
    let invites = state.db.list_pending_invites_for(user.id, &user.email)?;
    Ok(Json(
        invites
            .into_iter()
            .map(|(invite, project, inviter)| InviteDetailOut {
                id: invite.id,
                project_id: invite.project_id,
                invited_email: invite.invited_email,
                status: invite.status,
                created_at: invite.created_at,
                project: project.into(),
                invited_by: inviter.into(),
            })
            .collect(),
    ))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<InviteOut>> {
    let invite = state.db.respond_invite(invite_id, &user, true)?;
    Ok(Json(invite.into()))
}

pub async fn decline_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<InviteOut>> {
    let invite = state.db.respond_invite(invite_id, &user, false)?;
    Ok(Json(invite.into()))
}
