use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use proofdeck_types::api::{
    ActivityOut, AssetOut, CommentOut, InviteOut, ProjectOut, ReactionOut, UserOut,
};
use proofdeck_types::models::{ActivityKind, InviteStatus};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub const COLUMNS: &'static str = "id, email, display_name, picture, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            picture: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    /// Display name when set, email otherwise. Used for activity messages.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

impl From<UserRow> for UserOut {
    fn from(row: UserRow) -> Self {
        UserOut {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            picture: row.picture,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub deadline: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProjectRow {
    pub const COLUMNS: &'static str =
        "id, name, description, owner_id, is_archived, archived_at, deadline, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            owner_id: row.get(3)?,
            is_archived: row.get(4)?,
            archived_at: row.get(5)?,
            deadline: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl From<ProjectRow> for ProjectOut {
    fn from(row: ProjectRow) -> Self {
        ProjectOut {
            id: row.id,
            name: row.name,
            description: row.description,
            owner_id: row.owner_id,
            is_archived: row.is_archived,
            archived_at: row.archived_at,
            deadline: row.deadline,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticipantRow {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InviteRow {
    pub id: i64,
    pub project_id: i64,
    pub invited_email: String,
    pub invited_user_id: Option<i64>,
    pub invited_by_id: i64,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl InviteRow {
    pub const COLUMNS: &'static str =
        "id, project_id, invited_email, invited_user_id, invited_by_id, status, created_at, responded_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            invited_email: row.get(2)?,
            invited_user_id: row.get(3)?,
            invited_by_id: row.get(4)?,
            status: parse_text(5, row.get::<_, String>(5)?)?,
            created_at: row.get(6)?,
            responded_at: row.get(7)?,
        })
    }
}

impl From<InviteRow> for InviteOut {
    fn from(row: InviteRow) -> Self {
        InviteOut {
            id: row.id,
            project_id: row.project_id,
            invited_email: row.invited_email,
            status: row.status,
            created_at: row.created_at,
            responded_at: row.responded_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetRow {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub file_path: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl AssetRow {
    pub const COLUMNS: &'static str = "id, project_id, user_id, file_path, version, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            user_id: row.get(2)?,
            file_path: row.get(3)?,
            version: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl From<AssetRow> for AssetOut {
    fn from(row: AssetRow) -> Self {
        AssetOut {
            id: row.id,
            project_id: row.project_id,
            user_id: row.user_id,
            file_path: row.file_path,
            version: row.version,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub asset_id: i64,
    pub user_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl CommentRow {
    pub const COLUMNS: &'static str = "id, asset_id, user_id, content, parent_id, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            asset_id: row.get(1)?,
            user_id: row.get(2)?,
            content: row.get(3)?,
            parent_id: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub id: i64,
    pub comment_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl ReactionRow {
    pub const COLUMNS: &'static str = "id, comment_id, user_id, emoji, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            comment_id: row.get(1)?,
            user_id: row.get(2)?,
            emoji: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl From<ReactionRow> for ReactionOut {
    fn from(row: ReactionRow) -> Self {
        ReactionOut {
            id: row.id,
            comment_id: row.comment_id,
            user_id: row.user_id,
            emoji: row.emoji,
            created_at: row.created_at,
        }
    }
}

/// A comment joined with its author and current reactions, the shape the
/// listing endpoint renders.
#[derive(Debug, Clone)]
pub struct CommentDetail {
    pub comment: CommentRow,
    pub author: UserRow,
    pub reactions: Vec<ReactionRow>,
}

impl From<CommentDetail> for CommentOut {
    fn from(detail: CommentDetail) -> Self {
        CommentOut {
            id: detail.comment.id,
            asset_id: detail.comment.asset_id,
            user_id: detail.comment.user_id,
            content: detail.comment.content,
            parent_id: detail.comment.parent_id,
            created_at: detail.comment.created_at,
            user: detail.author.into(),
            reactions: detail.reactions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub kind: ActivityKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityRow {
    pub const COLUMNS: &'static str = "id, project_id, user_id, type, message, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            user_id: row.get(2)?,
            kind: parse_text(3, row.get::<_, String>(3)?)?,
            message: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl From<ActivityRow> for ActivityOut {
    fn from(row: ActivityRow) -> Self {
        ActivityOut {
            id: row.id,
            project_id: row.project_id,
            user_id: row.user_id,
            kind: row.kind,
            message: row.message,
            created_at: row.created_at,
        }
    }
}

fn parse_text<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> rusqlite::Result<Option<T>>;
}

impl<T> OptionalExt<T> for rusqlite::Result<T> {
    fn optional(self) -> rusqlite::Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
