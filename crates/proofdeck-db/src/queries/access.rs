use chrono::Utc;
use rusqlite::Connection;

use proofdeck_types::models::Role;

use crate::models::{OptionalExt, ParticipantRow, ProjectRow, UserRow};
use crate::queries::projects::query_project;
use crate::{Database, StoreError, StoreResult};

impl Database {
    /// The access resolver: Owner iff the project's owner_id matches, else
    /// Collaborator iff a participant row exists, else None. Errs with
    /// NotFound when the project itself is missing.
    pub fn resolve_role(&self, project_id: i64, user_id: i64) -> StoreResult<Role> {
        self.project_with_role(project_id, user_id)
            .map(|(_, role)| role)
    }

    /// Resolver variant that also returns the project row, for handlers that
    /// need both in one round trip.
    pub fn project_with_role(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> StoreResult<(ProjectRow, Role)> {
        self.with_conn(|conn| {
            let project = query_project(conn, project_id)?
                .ok_or_else(|| StoreError::NotFound("Project not found".into()))?;
            let role = role_of(conn, &project, user_id)?;
            Ok((project, role))
        })
    }

    pub fn list_participants(
        &self,
        project_id: i64,
    ) -> StoreResult<Vec<(ParticipantRow, UserRow)>> {
        self.with_conn(|conn| {
            // JOIN users so the listing carries author identity in one query
            let mut stmt = conn.prepare(
                "SELECT pp.id, pp.project_id, pp.user_id, pp.role, pp.created_at,
                        u.id, u.email, u.display_name, u.picture, u.created_at
                 FROM project_participants pp
                 JOIN users u ON pp.user_id = u.id
                 WHERE pp.project_id = ?1
                 ORDER BY pp.created_at ASC, pp.id ASC",
            )?;
            let rows = stmt
                .query_map([project_id], |row| {
                    Ok((
                        ParticipantRow {
                            id: row.get(0)?,
                            project_id: row.get(1)?,
                            user_id: row.get(2)?,
                            role: row.get(3)?,
                            created_at: row.get(4)?,
                        },
                        UserRow {
                            id: row.get(5)?,
                            email: row.get(6)?,
                            display_name: row.get(7)?,
                            picture: row.get(8)?,
                            created_at: row.get(9)?,
                        },
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Membership removal. Prior contributions (comments, assets) are left
    /// untouched; only the membership fact goes away.
    pub fn remove_participant(&self, project_id: i64, user_id: i64) -> StoreResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM project_participants WHERE project_id = ?1 AND user_id = ?2",
                [project_id, user_id],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound(
                    "Participant not found on this project.".into(),
                ));
            }
            Ok(())
        })
    }
}

fn role_of(conn: &Connection, project: &ProjectRow, user_id: i64) -> Result<Role, StoreError> {
    if project.owner_id == user_id {
        return Ok(Role::Owner);
    }
    if is_participant(conn, project.id, user_id)? {
        return Ok(Role::Collaborator);
    }
    Ok(Role::None)
}

fn is_participant(
    conn: &Connection,
    project_id: i64,
    user_id: i64,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM project_participants WHERE project_id = ?1 AND user_id = ?2",
        [project_id, user_id],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

pub(crate) fn insert_participant(
    conn: &Connection,
    project_id: i64,
    user_id: i64,
) -> rusqlite::Result<()> {
    // OR IGNORE: accepting a second invite to a project you already joined
    // is success, not a duplicate membership
    conn.execute(
        "INSERT OR IGNORE INTO project_participants (project_id, user_id, role, created_at)
         VALUES (?1, ?2, 'member', ?3)",
        rusqlite::params![project_id, user_id, Utc::now()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use proofdeck_types::models::Role;

    use crate::{Database, StoreError};

    fn setup() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner@example.com", None, None).unwrap();
        let member = db.create_user("member@example.com", None, None).unwrap();
        let project = db.create_project(owner.id, "Launch", None, None).unwrap();
        let invite = db
            .create_invite(project.id, "member@example.com", owner.id)
            .unwrap();
        db.respond_invite(invite.id, &member, true).unwrap();
        (db, project.id, owner.id, member.id)
    }

    #[test]
    fn roles_are_exclusive_and_exhaustive() {
        let (db, project_id, owner_id, member_id) = setup();
        let stranger = db.create_user("s@example.com", None, None).unwrap();

        assert_eq!(db.resolve_role(project_id, owner_id).unwrap(), Role::Owner);
        assert_eq!(
            db.resolve_role(project_id, member_id).unwrap(),
            Role::Collaborator
        );
        assert_eq!(db.resolve_role(project_id, stranger.id).unwrap(), Role::None);
    }

    #[test]
    fn missing_project_is_not_found() {
        let (db, _, owner_id, _) = setup();
        assert!(matches!(
            db.resolve_role(4242, owner_id).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn removal_revokes_role_but_not_content() {
        let (db, project_id, owner_id, member_id) = setup();
        let asset = db
            .insert_asset(project_id, member_id, "draft.png", "member@example.com")
            .unwrap();
        let comment = db
            .insert_comment(asset.id, member_id, "hi", None, project_id, "member@example.com")
            .unwrap();

        db.remove_participant(project_id, member_id).unwrap();
        assert_eq!(db.resolve_role(project_id, member_id).unwrap(), Role::None);

        // prior contributions survive membership removal
        assert!(db.get_comment(comment.id).unwrap().is_some());
        assert!(db.get_asset(asset.id).unwrap().is_some());
        let _ = owner_id;
    }

    #[test]
    fn removing_non_participant_is_not_found() {
        let (db, project_id, owner_id, _) = setup();
        assert!(matches!(
            db.remove_participant(project_id, owner_id).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn participant_listing_embeds_users() {
        let (db, project_id, _, member_id) = setup();
        let listed = db.list_participants(project_id).unwrap();
        assert_eq!(listed.len(), 1);
        let (participant, user) = &listed[0];
        assert_eq!(participant.user_id, member_id);
        assert_eq!(participant.role, "member");
        assert_eq!(user.email, "member@example.com");
    }
}
