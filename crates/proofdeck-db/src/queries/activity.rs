use chrono::Utc;
use rusqlite::Connection;

use proofdeck_types::models::ActivityKind;

use crate::models::ActivityRow;
use crate::{Database, StoreResult};

/// Append one activity row. Called from inside the triggering mutation's
/// transaction: the log write commits or rolls back with the mutation
/// (atomic policy, see DESIGN.md).
pub(crate) fn insert_activity(
    conn: &Connection,
    project_id: i64,
    user_id: i64,
    kind: ActivityKind,
    message: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO activities (project_id, user_id, type, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![project_id, user_id, kind.as_str(), message, Utc::now()],
    )?;
    Ok(())
}

impl Database {
    /// The most recent 50 entries, newest first.
    pub fn list_activity(&self, project_id: i64) -> StoreResult<Vec<ActivityRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM activities WHERE project_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT 50",
                ActivityRow::COLUMNS
            ))?;
            let rows = stmt
                .query_map([project_id], ActivityRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use proofdeck_types::models::ActivityKind;

    use crate::Database;

    #[test]
    fn feed_is_newest_first_and_capped_at_fifty() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner@example.com", Some("Owner"), None).unwrap();
        let project = db.create_project(owner.id, "Launch", None, None).unwrap();

        for _ in 0..55 {
            db.insert_asset(project.id, owner.id, "f.png", "Owner").unwrap();
        }

        let log = db.list_activity(project.id).unwrap();
        assert_eq!(log.len(), 50);
        // newest first: ids strictly decreasing
        assert!(log.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[test]
    fn qualifying_mutations_log_in_order() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner@example.com", Some("Owner"), None).unwrap();
        let project = db.create_project(owner.id, "Launch", None, None).unwrap();

        let asset = db.insert_asset(project.id, owner.id, "f.png", "Owner").unwrap();
        let comment = db
            .insert_comment(asset.id, owner.id, "looks good", None, project.id, "Owner")
            .unwrap();
        db.toggle_reaction(comment.id, owner.id, "👍", project.id, "Owner")
            .unwrap();

        let kinds: Vec<ActivityKind> =
            db.list_activity(project.id).unwrap().iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::CommentReacted,
                ActivityKind::CommentAdded,
                ActivityKind::AssetUploaded,
            ]
        );
    }
}
