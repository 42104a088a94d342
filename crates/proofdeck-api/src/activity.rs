use axum::{
    Extension, Json,
    extract::{Path, State},
};

use proofdeck_types::api::ActivityOut;

use crate::AppState;
use crate::access::ensure_access;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;

/// Project feed: the most recent 50 entries, newest first. Owner or member.
pub async fn list_activity(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ActivityOut>>> {
    ensure_access(&state.db, project_id, user.id)?;

    let activities = state.db.list_activity(project_id)?;
    Ok(Json(activities.into_iter().map(Into::into).collect()))
}
