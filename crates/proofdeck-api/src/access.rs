use proofdeck_db::models::{AssetRow, ProjectRow};
use proofdeck_db::{Database, StoreError};
use proofdeck_types::models::Role;

use crate::error::{ApiError, ApiResult};

/// Shared response for "project missing" and "caller has no role". The two
/// cases must be indistinguishable from outside so non-members cannot probe
/// which project ids exist.
pub const PROJECT_GONE: &str = "Project not found or access denied";

const ASSET_GONE: &str = "Asset not found";

/// Resolve the caller against a project. A missing project and a caller
/// resolved to `Role::None` both come back as the same NotFound.
pub fn ensure_access(
    db: &Database,
    project_id: i64,
    user_id: i64,
) -> ApiResult<(ProjectRow, Role)> {
    match db.project_with_role(project_id, user_id) {
        Ok((_, Role::None)) | Err(StoreError::NotFound(_)) => {
            Err(ApiError::NotFound(PROJECT_GONE.into()))
        }
        Ok(pair) => Ok(pair),
        Err(e) => Err(e.into()),
    }
}

/// Owner gate. A member who is not the owner gets Forbidden — they already
/// know the project exists; everyone else sees the shared NotFound.
pub fn ensure_owner(db: &Database, project_id: i64, user_id: i64) -> ApiResult<ProjectRow> {
    let (project, role) = ensure_access(db, project_id, user_id)?;
    if role != Role::Owner {
        return Err(ApiError::Forbidden(
            "Only the project owner can perform this action".into(),
        ));
    }
    Ok(project)
}

/// Asset-scoped variant: the asset must exist and the caller must hold a
/// role on its project, with the same collapse for outsiders.
pub fn asset_with_access(
    db: &Database,
    asset_id: i64,
    user_id: i64,
) -> ApiResult<(AssetRow, ProjectRow, Role)> {
    let asset = db
        .get_asset(asset_id)?
        .ok_or_else(|| ApiError::NotFound(ASSET_GONE.into()))?;

    match db.project_with_role(asset.project_id, user_id) {
        Ok((_, Role::None)) | Err(StoreError::NotFound(_)) => {
            Err(ApiError::NotFound(ASSET_GONE.into()))
        }
        Ok((project, role)) => Ok((asset, project, role)),
        Err(e) => Err(e.into()),
    }
}
