use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {field} value: {value}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

/// A caller's standing on a project. Owner is derived from
/// `projects.owner_id` and is never stored as a participant row;
/// the three variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Collaborator,
    None,
}

impl Role {
    pub fn is_member(self) -> bool {
        !matches!(self, Role::None)
    }
}

/// Invite lifecycle. `Accepted` and `Declined` are terminal; the only
/// valid transitions are out of `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

impl InviteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InviteStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InviteStatus::Pending),
            "accepted" => Ok(InviteStatus::Accepted),
            "declined" => Ok(InviteStatus::Declined),
            other => Err(ParseEnumError {
                field: "invite status",
                value: other.to_string(),
            }),
        }
    }
}

/// Kinds of activity-feed entries. The log is append-only; rows are
/// never updated after insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    AssetUploaded,
    CommentAdded,
    CommentReacted,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::AssetUploaded => "asset_uploaded",
            ActivityKind::CommentAdded => "comment_added",
            ActivityKind::CommentReacted => "comment_reacted",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset_uploaded" => Ok(ActivityKind::AssetUploaded),
            "comment_added" => Ok(ActivityKind::CommentAdded),
            "comment_reacted" => Ok(ActivityKind::CommentReacted),
            other => Err(ParseEnumError {
                field: "activity kind",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_status_round_trips() {
        for status in [InviteStatus::Pending, InviteStatus::Accepted, InviteStatus::Declined] {
            assert_eq!(status.as_str().parse::<InviteStatus>().unwrap(), status);
        }
        assert!("expired".parse::<InviteStatus>().is_err());
    }

    #[test]
    fn activity_kind_round_trips() {
        for kind in [
            ActivityKind::AssetUploaded,
            ActivityKind::CommentAdded,
            ActivityKind::CommentReacted,
        ] {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn owner_and_collaborator_are_members() {
        assert!(Role::Owner.is_member());
        assert!(Role::Collaborator.is_member());
        assert!(!Role::None.is_member());
    }
}
