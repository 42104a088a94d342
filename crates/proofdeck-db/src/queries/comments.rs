use std::collections::HashMap;

use chrono::Utc;
use rusqlite::Connection;

use proofdeck_types::models::ActivityKind;

use crate::error::is_unique_violation;
use crate::models::{CommentDetail, CommentRow, OptionalExt, ReactionRow, UserRow};
use crate::queries::activity::insert_activity;
use crate::{Database, StoreError, StoreResult};

impl Database {
    /// Add a comment, logging `comment_added` in the same transaction.
    /// Content is expected trimmed and non-empty; parent validation (same
    /// asset) happens at the API layer before this call.
    pub fn insert_comment(
        &self,
        asset_id: i64,
        user_id: i64,
        content: &str,
        parent_id: Option<i64>,
        project_id: i64,
        actor_label: &str,
    ) -> StoreResult<CommentRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO comments (asset_id, user_id, content, parent_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![asset_id, user_id, content, parent_id, Utc::now()],
            )?;
            let id = tx.last_insert_rowid();

            insert_activity(
                &tx,
                project_id,
                user_id,
                ActivityKind::CommentAdded,
                &format!("{actor_label} commented on an asset."),
            )?;

            let comment = query_comment(&tx, id)?
                .ok_or_else(|| StoreError::NotFound("Comment not found".into()))?;

            tx.commit()?;
            Ok(comment)
        })
    }

    pub fn get_comment(&self, id: i64) -> StoreResult<Option<CommentRow>> {
        self.with_conn(|conn| Ok(query_comment(conn, id)?))
    }

    /// Comments for an asset, oldest first for a stable thread, each with
    /// its author and reactions. Reactions are batch-fetched in one query.
    pub fn list_comments(&self, asset_id: i64) -> StoreResult<Vec<CommentDetail>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the author in a single query (no N+1)
            let mut stmt = conn.prepare(
                "SELECT c.id, c.asset_id, c.user_id, c.content, c.parent_id, c.created_at,
                        u.id, u.email, u.display_name, u.picture, u.created_at
                 FROM comments c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.asset_id = ?1
                 ORDER BY c.created_at ASC, c.id ASC",
            )?;
            let rows = stmt
                .query_map([asset_id], |row| {
                    Ok((
                        CommentRow::from_row(row)?,
                        UserRow {
                            id: row.get(6)?,
                            email: row.get(7)?,
                            display_name: row.get(8)?,
                            picture: row.get(9)?,
                            created_at: row.get(10)?,
                        },
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let comment_ids: Vec<i64> = rows.iter().map(|(c, _)| c.id).collect();
            let mut reaction_map = query_reactions_grouped(conn, &comment_ids)?;

            Ok(rows
                .into_iter()
                .map(|(comment, author)| {
                    let reactions = reaction_map.remove(&comment.id).unwrap_or_default();
                    CommentDetail {
                        comment,
                        author,
                        reactions,
                    }
                })
                .collect())
        })
    }

    /// A single comment with author and reactions, the shape returned after
    /// a reaction toggle.
    pub fn get_comment_detail(&self, id: i64) -> StoreResult<Option<CommentDetail>> {
        self.with_conn(|conn| {
            let Some(comment) = query_comment(conn, id)? else {
                return Ok(None);
            };
            let author = crate::queries::users::query_user_by_id(conn, comment.user_id)?
                .ok_or_else(|| StoreError::NotFound("User not found".into()))?;
            let reactions = query_reactions_grouped(conn, &[id])?
                .remove(&id)
                .unwrap_or_default();
            Ok(Some(CommentDetail {
                comment,
                author,
                reactions,
            }))
        })
    }

    /// Delete one comment and its own reactions. Children are left in place
    /// as orphan sub-threads; their reactions survive too.
    pub fn delete_comment(&self, id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if query_comment(&tx, id)?.is_none() {
                return Err(StoreError::NotFound("Comment not found".into()));
            }

            tx.execute("DELETE FROM comment_reactions WHERE comment_id = ?1", [id])?;
            tx.execute("DELETE FROM comments WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Toggle a reaction: removes the (comment, user, emoji) row if present,
    /// inserts it otherwise. Only the react half logs activity; un-reacting
    /// is silent. Returns true when the reaction was added.
    pub fn toggle_reaction(
        &self,
        comment_id: i64,
        user_id: i64,
        emoji: &str,
        project_id: i64,
        actor_label: &str,
    ) -> StoreResult<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM comment_reactions
                     WHERE comment_id = ?1 AND user_id = ?2 AND emoji = ?3",
                    rusqlite::params![comment_id, user_id, emoji],
                    |row| row.get(0),
                )
                .optional()?;

            let added = if let Some(existing_id) = existing {
                tx.execute("DELETE FROM comment_reactions WHERE id = ?1", [existing_id])?;
                false
            } else {
                tx.execute(
                    "INSERT INTO comment_reactions (comment_id, user_id, emoji, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![comment_id, user_id, emoji, Utc::now()],
                )
                .map_err(|e| {
                    // unique (comment, user, emoji) backstops the toggle race
                    if is_unique_violation(&e) {
                        StoreError::Conflict("Reaction already exists.".into())
                    } else {
                        e.into()
                    }
                })?;

                insert_activity(
                    &tx,
                    project_id,
                    user_id,
                    ActivityKind::CommentReacted,
                    &format!("{actor_label} reacted {emoji} to a comment."),
                )?;
                true
            };

            tx.commit()?;
            Ok(added)
        })
    }
}

fn query_comment(conn: &Connection, id: i64) -> rusqlite::Result<Option<CommentRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comments WHERE id = ?1",
        CommentRow::COLUMNS
    ))?;
    stmt.query_row([id], CommentRow::from_row).optional()
}

/// Batch-fetch reactions for a set of comment ids, grouped by comment.
fn query_reactions_grouped(
    conn: &Connection,
    comment_ids: &[i64],
) -> rusqlite::Result<HashMap<i64, Vec<ReactionRow>>> {
    if comment_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=comment_ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {} FROM comment_reactions WHERE comment_id IN ({})
         ORDER BY created_at ASC, id ASC",
        ReactionRow::COLUMNS,
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = comment_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(params.as_slice(), ReactionRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut grouped: HashMap<i64, Vec<ReactionRow>> = HashMap::new();
    for reaction in rows {
        grouped.entry(reaction.comment_id).or_default().push(reaction);
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use proofdeck_types::models::ActivityKind;

    use crate::{Database, StoreError};

    fn setup() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner@example.com", Some("Owner"), None).unwrap();
        let project = db.create_project(owner.id, "Launch", None, None).unwrap();
        let asset = db
            .insert_asset(project.id, owner.id, "f.png", "Owner")
            .unwrap();
        (db, project.id, asset.id, owner.id)
    }

    #[test]
    fn listing_is_oldest_first_with_authors() {
        let (db, project_id, asset_id, owner_id) = setup();
        let first = db
            .insert_comment(asset_id, owner_id, "first", None, project_id, "Owner")
            .unwrap();
        let second = db
            .insert_comment(asset_id, owner_id, "second", Some(first.id), project_id, "Owner")
            .unwrap();

        let listed = db.list_comments(asset_id).unwrap();
        assert_eq!(
            listed.iter().map(|d| d.comment.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert_eq!(listed[0].author.email, "owner@example.com");
        assert_eq!(listed[1].comment.parent_id, Some(first.id));
    }

    #[test]
    fn toggle_is_an_involution() {
        let (db, project_id, asset_id, owner_id) = setup();
        let comment = db
            .insert_comment(asset_id, owner_id, "note", None, project_id, "Owner")
            .unwrap();

        let added = db
            .toggle_reaction(comment.id, owner_id, "👍", project_id, "Owner")
            .unwrap();
        assert!(added);
        let detail = db.get_comment_detail(comment.id).unwrap().unwrap();
        assert_eq!(detail.reactions.len(), 1);
        assert_eq!(detail.reactions[0].emoji, "👍");

        let added = db
            .toggle_reaction(comment.id, owner_id, "👍", project_id, "Owner")
            .unwrap();
        assert!(!added);
        let detail = db.get_comment_detail(comment.id).unwrap().unwrap();
        assert!(detail.reactions.is_empty());
    }

    #[test]
    fn distinct_emojis_coexist_per_user() {
        let (db, project_id, asset_id, owner_id) = setup();
        let comment = db
            .insert_comment(asset_id, owner_id, "note", None, project_id, "Owner")
            .unwrap();

        db.toggle_reaction(comment.id, owner_id, "👍", project_id, "Owner").unwrap();
        db.toggle_reaction(comment.id, owner_id, "❤️", project_id, "Owner").unwrap();

        let detail = db.get_comment_detail(comment.id).unwrap().unwrap();
        assert_eq!(detail.reactions.len(), 2);
    }

    #[test]
    fn only_the_react_half_logs_activity() {
        let (db, project_id, asset_id, owner_id) = setup();
        let comment = db
            .insert_comment(asset_id, owner_id, "note", None, project_id, "Owner")
            .unwrap();

        db.toggle_reaction(comment.id, owner_id, "👍", project_id, "Owner").unwrap();
        db.toggle_reaction(comment.id, owner_id, "👍", project_id, "Owner").unwrap();

        let reacted: Vec<_> = db
            .list_activity(project_id)
            .unwrap()
            .into_iter()
            .filter(|a| a.kind == ActivityKind::CommentReacted)
            .collect();
        assert_eq!(reacted.len(), 1);
        assert_eq!(reacted[0].message, "Owner reacted 👍 to a comment.");
    }

    #[test]
    fn deleting_a_parent_keeps_children_and_their_reactions() {
        let (db, project_id, asset_id, owner_id) = setup();
        let parent = db
            .insert_comment(asset_id, owner_id, "parent", None, project_id, "Owner")
            .unwrap();
        let child = db
            .insert_comment(asset_id, owner_id, "child", Some(parent.id), project_id, "Owner")
            .unwrap();
        db.toggle_reaction(child.id, owner_id, "💡", project_id, "Owner").unwrap();

        db.delete_comment(parent.id).unwrap();

        assert!(db.get_comment(parent.id).unwrap().is_none());
        let orphan = db.get_comment_detail(child.id).unwrap().unwrap();
        assert_eq!(orphan.comment.parent_id, Some(parent.id));
        assert_eq!(orphan.reactions.len(), 1);
    }

    #[test]
    fn delete_missing_comment_is_not_found() {
        let (db, _, _, _) = setup();
        assert!(matches!(
            db.delete_comment(31337).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}
