use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{ActivityKind, InviteStatus};

/// Distinguishes an absent PATCH field from an explicit null: a missing
/// field deserializes (via `#[serde(default)]`) to `None`, a `null` to
/// `Some(None)`, a value to `Some(Some(v))`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the external session
/// layer that mints tokens. Canonical definition lives here in
/// proofdeck-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Clone, Serialize)]
pub struct UserOut {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Projects --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Partial update. `description` and `deadline` are nullable columns, so
/// they use the double-option shape to tell "leave alone" from "clear".
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectOut {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub deadline: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Participants --

#[derive(Debug, Serialize)]
pub struct ParticipantOut {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub role: String,
    pub user: UserOut,
}

// -- Invites --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInviteRequest {
    pub invited_email: String,
}

#[derive(Debug, Serialize)]
pub struct InviteOut {
    pub id: i64,
    pub project_id: i64,
    pub invited_email: String,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// Pending-invite listing embeds the project and the inviting user so the
/// client can render a notification without extra round trips.
#[derive(Debug, Serialize)]
pub struct InviteDetailOut {
    pub id: i64,
    pub project_id: i64,
    pub invited_email: String,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub project: ProjectOut,
    pub invited_by: UserOut,
}

// -- Assets --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAssetRequest {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct AssetOut {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub file_path: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionOut {
    pub id: i64,
    pub comment_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentOut {
    pub id: i64,
    pub asset_id: i64,
    pub user_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub user: UserOut,
    pub reactions: Vec<ReactionOut>,
}

// -- Activity --

#[derive(Debug, Serialize)]
pub struct ActivityOut {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
