use chrono::Utc;
use rusqlite::Connection;

use crate::models::{OptionalExt, ProjectRow};
use crate::{Database, StoreError, StoreResult};

impl Database {
    pub fn create_project(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
        deadline: Option<&str>,
    ) -> StoreResult<ProjectRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (name, description, owner_id, deadline, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![name, description, owner_id, deadline, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            query_project(conn, id)?
                .ok_or_else(|| StoreError::NotFound("Project not found".into()))
        })
    }

    pub fn get_project(&self, id: i64) -> StoreResult<Option<ProjectRow>> {
        self.with_conn(|conn| Ok(query_project(conn, id)?))
    }

    /// Projects the user owns plus projects they collaborate on, newest first.
    pub fn list_projects_for(&self, user_id: i64) -> StoreResult<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT {cols}
                 FROM projects p
                 LEFT JOIN project_participants pp
                        ON pp.project_id = p.id AND pp.user_id = ?1
                 WHERE p.owner_id = ?1 OR pp.id IS NOT NULL
                 ORDER BY p.created_at DESC, p.id DESC",
                cols = prefixed_columns("p"),
            ))?;
            let rows = stmt
                .query_map([user_id], ProjectRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Partial update. `description` and `deadline` are double-wrapped:
    /// outer None leaves the column alone, `Some(None)` clears it.
    /// `is_archived` transitions stamp or clear `archived_at`.
    pub fn update_project(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<Option<&str>>,
        deadline: Option<Option<&str>>,
        is_archived: Option<bool>,
    ) -> StoreResult<ProjectRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut project = query_project(&tx, id)?
                .ok_or_else(|| StoreError::NotFound("Project not found".into()))?;

            if let Some(name) = name {
                project.name = name.to_string();
            }
            if let Some(description) = description {
                project.description = description.map(str::to_string);
            }
            if let Some(deadline) = deadline {
                project.deadline = deadline.map(str::to_string);
            }
            if let Some(archived) = is_archived {
                if archived && !project.is_archived {
                    project.archived_at = Some(Utc::now());
                } else if !archived {
                    project.archived_at = None;
                }
                project.is_archived = archived;
            }

            tx.execute(
                "UPDATE projects
                 SET name = ?1, description = ?2, deadline = ?3,
                     is_archived = ?4, archived_at = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    project.name,
                    project.description,
                    project.deadline,
                    project.is_archived,
                    project.archived_at,
                    id
                ],
            )?;

            tx.commit()?;
            Ok(project)
        })
    }

    /// Hard delete: assets, their comments and reactions, participants,
    /// invites and activities all go with the project, in one transaction.
    pub fn delete_project(&self, id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if query_project(&tx, id)?.is_none() {
                return Err(StoreError::NotFound("Project not found".into()));
            }

            tx.execute(
                "DELETE FROM comment_reactions WHERE comment_id IN (
                     SELECT c.id FROM comments c
                     JOIN assets a ON c.asset_id = a.id
                     WHERE a.project_id = ?1
                 )",
                [id],
            )?;
            tx.execute(
                "DELETE FROM comments WHERE asset_id IN (
                     SELECT id FROM assets WHERE project_id = ?1
                 )",
                [id],
            )?;
            tx.execute("DELETE FROM assets WHERE project_id = ?1", [id])?;
            tx.execute("DELETE FROM project_participants WHERE project_id = ?1", [id])?;
            tx.execute("DELETE FROM project_invites WHERE project_id = ?1", [id])?;
            tx.execute("DELETE FROM activities WHERE project_id = ?1", [id])?;
            tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(())
        })
    }
}

pub(crate) fn query_project(conn: &Connection, id: i64) -> rusqlite::Result<Option<ProjectRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM projects WHERE id = ?1",
        ProjectRow::COLUMNS
    ))?;
    stmt.query_row([id], ProjectRow::from_row).optional()
}

fn prefixed_columns(alias: &str) -> String {
    ProjectRow::COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::{Database, StoreError};

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner@example.com", Some("Owner"), None).unwrap();
        (db, owner.id)
    }

    #[test]
    fn create_and_fetch() {
        let (db, owner_id) = setup();
        let project = db
            .create_project(owner_id, "Launch", Some("Q3 campaign"), None)
            .unwrap();
        assert_eq!(project.owner_id, owner_id);
        assert!(!project.is_archived);

        let fetched = db.get_project(project.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Launch");
    }

    #[test]
    fn archiving_stamps_archived_at() {
        let (db, owner_id) = setup();
        let project = db.create_project(owner_id, "Launch", None, None).unwrap();

        let archived = db
            .update_project(project.id, None, None, None, Some(true))
            .unwrap();
        assert!(archived.is_archived);
        assert!(archived.archived_at.is_some());

        let restored = db
            .update_project(project.id, None, None, None, Some(false))
            .unwrap();
        assert!(!restored.is_archived);
        assert!(restored.archived_at.is_none());
    }

    #[test]
    fn update_distinguishes_absent_from_cleared() {
        let (db, owner_id) = setup();
        let project = db
            .create_project(owner_id, "Launch", Some("Q3 campaign"), Some("2026-09-30"))
            .unwrap();

        // outer None leaves both columns alone
        let untouched = db
            .update_project(project.id, Some("Relaunch"), None, None, None)
            .unwrap();
        assert_eq!(untouched.description.as_deref(), Some("Q3 campaign"));
        assert_eq!(untouched.deadline.as_deref(), Some("2026-09-30"));

        // Some(None) clears back to null
        let cleared = db
            .update_project(project.id, None, Some(None), Some(None), None)
            .unwrap();
        assert!(cleared.description.is_none());
        assert!(cleared.deadline.is_none());
    }

    #[test]
    fn delete_cascades_everything() {
        let (db, owner_id) = setup();
        let member = db.create_user("m@example.com", None, None).unwrap();
        let project = db.create_project(owner_id, "Launch", None, None).unwrap();
        let asset = db
            .insert_asset(project.id, owner_id, "a.png", "Owner")
            .unwrap();
        let comment = db
            .insert_comment(asset.id, owner_id, "first", None, project.id, "Owner")
            .unwrap();
        db.toggle_reaction(comment.id, owner_id, "👍", project.id, "Owner")
            .unwrap();
        let invite = db
            .create_invite(project.id, "m@example.com", owner_id)
            .unwrap();
        db.respond_invite(invite.id, &member, true).unwrap();

        db.delete_project(project.id).unwrap();

        assert!(db.get_project(project.id).unwrap().is_none());
        assert!(db.get_asset(asset.id).unwrap().is_none());
        assert!(db.get_comment(comment.id).unwrap().is_none());
        assert!(db.list_activity(project.id).unwrap().is_empty());
        assert!(db
            .list_pending_invites_for(member.id, "m@example.com")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn delete_missing_project_is_not_found() {
        let (db, _) = setup();
        assert!(matches!(
            db.delete_project(999).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn listing_includes_collaborations() {
        let (db, owner_id) = setup();
        let other = db.create_user("other@example.com", None, None).unwrap();
        let mine = db.create_project(owner_id, "Mine", None, None).unwrap();
        let theirs = db.create_project(other.id, "Theirs", None, None).unwrap();

        // owner sees only their own project until invited elsewhere
        let listed = db.list_projects_for(owner_id).unwrap();
        assert_eq!(listed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![mine.id]);

        let invite = db
            .create_invite(theirs.id, "owner@example.com", other.id)
            .unwrap();
        let owner = db.get_user_by_id(owner_id).unwrap().unwrap();
        db.respond_invite(invite.id, &owner, true).unwrap();

        let listed = db.list_projects_for(owner_id).unwrap();
        let ids: Vec<i64> = listed.iter().map(|p| p.id).collect();
        assert!(ids.contains(&mine.id) && ids.contains(&theirs.id));
    }
}
