use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use proofdeck_types::api::{AssetOut, CreateAssetRequest};
use proofdeck_types::models::Role;

use crate::AppState;
use crate::access::ensure_access;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;

/// Register an uploaded asset. Binary storage lives behind a separate file
/// service; this records the stored name and assigns the next version
/// number for the project.
pub async fn upload_asset(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateAssetRequest>,
) -> ApiResult<impl IntoResponse> {
    let (project, _role) = ensure_access(&state.db, project_id, user.id)?;

    let file_name = req.file_name.trim();
    if file_name.is_empty() {
        return Err(ApiError::Validation("File name cannot be empty".into()));
    }

    // Keep the original extension, replace the rest with a generated name
    let ext = std::path::Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    let file_path = format!("project_{}_{}{}", project.id, Uuid::new_v4(), ext);

    let asset = state
        .db
        .insert_asset(project.id, user.id, &file_path, user.label())?;
    Ok((StatusCode::CREATED, Json(AssetOut::from(asset))))
}

pub async fn list_assets(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<AssetOut>>> {
    ensure_access(&state.db, project_id, user.id)?;

    let assets = state.db.list_assets(project_id)?;
    Ok(Json(assets.into_iter().map(Into::into).collect()))
}

/// The owner may delete any asset; a collaborator only their own uploads.
/// The asset's comments and their reactions go with it.
pub async fn delete_asset(
    State(state): State<AppState>,
    Path((project_id, asset_id)): Path<(i64, i64)>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let (_, role) = ensure_access(&state.db, project_id, user.id)?;

    let asset = state
        .db
        .get_asset(asset_id)?
        .filter(|a| a.project_id == project_id)
        .ok_or_else(|| ApiError::NotFound("Asset not found".into()))?;

    if role != Role::Owner && asset.user_id != user.id {
        return Err(ApiError::Forbidden(
            "You are not allowed to delete this asset".into(),
        ));
    }

    state.db.delete_asset(asset_id)?;
    Ok(StatusCode::NO_CONTENT)
}
