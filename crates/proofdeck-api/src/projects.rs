use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use proofdeck_types::api::{
    CreateProjectRequest, ParticipantOut, ProjectOut, UpdateProjectRequest,
};
use proofdeck_types::models::Role;

use crate::AppState;
use crate::access::{ensure_access, ensure_owner};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ProjectOut>>> {
    let projects = state.db.list_projects_for(user.id)?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Project name cannot be empty".into()));
    }

    let project = state.db.create_project(
        user.id,
        name,
        req.description.as_deref(),
        req.deadline.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(ProjectOut::from(project))))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<ProjectOut>> {
    let (project, _role) = ensure_access(&state.db, project_id, user.id)?;
    Ok(Json(project.into()))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectOut>> {
    ensure_owner(&state.db, project_id, user.id)?;

    let project = state.db.update_project(
        project_id,
        req.name.as_deref(),
        req.description.as_ref().map(|d| d.as_deref()),
        req.deadline.as_ref().map(|d| d.as_deref()),
        req.is_archived,
    )?;
    Ok(Json(project.into()))
}

/// Hard delete, owner only. Assets, comments, reactions, participants,
/// invites and the activity log all go with the project.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    ensure_owner(&state.db, project_id, user.id)?;
    state.db.delete_project(project_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_participants(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ParticipantOut>>> {
    ensure_access(&state.db, project_id, user.id)?;

    let participants = state.db.list_participants(project_id)?;
    Ok(Json(
        participants
            .into_iter()
            .map(|(p, u)| ParticipantOut {
                id: p.id,
                project_id: p.project_id,
                user_id: p.user_id,
                role: p.role,
                user: u.into(),
            })
            .collect(),
    ))
}

/// Owner removes a collaborator. The target's prior comments and assets
/// stay; only the membership goes.
pub async fn remove_participant(
    State(state): State<AppState>,
    Path((project_id, user_id)): Path<(i64, i64)>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let project = ensure_owner(&state.db, project_id, user.id)?;

    if user_id == project.owner_id {
        return Err(ApiError::Validation(
            "Owner cannot be removed from their own project.".into(),
        ));
    }

    state.db.remove_participant(project_id, user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// A member walks away from a project on their own.
pub async fn leave_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let (_, role) = ensure_access(&state.db, project_id, user.id)?;

    if role == Role::Owner {
        return Err(ApiError::Validation(
            "The owner cannot leave their own project.".into(),
        ));
    }

    state.db.remove_participant(project_id, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}
