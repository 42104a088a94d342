use chrono::Utc;
use rusqlite::Connection;

use proofdeck_types::models::InviteStatus;

use crate::error::is_unique_violation;
use crate::models::{InviteRow, OptionalExt, ProjectRow, UserRow};
use crate::queries::access::insert_participant;
use crate::{Database, StoreError, StoreResult};

impl Database {
    /// Create a pending invite. `invited_user_id` is resolved opportunistically
    /// from an existing account with that email; it stays NULL until the
    /// addressee shows up. Expects a normalized (trimmed, lowercased) email.
    ///
    /// The pending-uniqueness check runs inside the insert transaction and the
    /// partial unique index backstops it, so two concurrent creates cannot
    /// both land.
    pub fn create_invite(
        &self,
        project_id: i64,
        invited_email: &str,
        invited_by_id: i64,
    ) -> StoreResult<InviteRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let pending_exists: bool = tx
                .query_row(
                    "SELECT 1 FROM project_invites
                     WHERE project_id = ?1 AND invited_email = ?2 AND status = 'pending'",
                    rusqlite::params![project_id, invited_email],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if pending_exists {
                return Err(StoreError::Conflict(
                    "There is already a pending invite for this email.".into(),
                ));
            }

            let invited_user_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM users WHERE email = ?1",
                    [invited_email],
                    |row| row.get(0),
                )
                .optional()?;

            tx.execute(
                "INSERT INTO project_invites
                     (project_id, invited_email, invited_user_id, invited_by_id, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                rusqlite::params![project_id, invited_email, invited_user_id, invited_by_id, Utc::now()],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict("There is already a pending invite for this email.".into())
                } else {
                    e.into()
                }
            })?;

            let id = tx.last_insert_rowid();
            let invite = query_invite(&tx, id)?
                .ok_or_else(|| StoreError::NotFound("Invite not found.".into()))?;

            tx.commit()?;
            Ok(invite)
        })
    }

    /// Pending invites addressed to the user, newest first, with the project
    /// and inviter for rendering. The dual match (linked id OR unlinked row
    /// with matching email) is required because invites may predate the
    /// addressee's account.
    pub fn list_pending_invites_for(
        &self,
        user_id: i64,
        email: &str,
    ) -> StoreResult<Vec<(InviteRow, ProjectRow, UserRow)>> {
        let email = email.trim().to_lowercase();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.id, i.project_id, i.invited_email, i.invited_user_id,
                        i.invited_by_id, i.status, i.created_at, i.responded_at,
                        p.id, p.name, p.description, p.owner_id, p.is_archived,
                        p.archived_at, p.deadline, p.created_at,
                        u.id, u.email, u.display_name, u.picture, u.created_at
                 FROM project_invites i
                 JOIN projects p ON i.project_id = p.id
                 JOIN users u ON i.invited_by_id = u.id
                 WHERE i.status = 'pending'
                   AND (i.invited_user_id = ?1
                        OR (i.invited_user_id IS NULL AND i.invited_email = ?2))
                 ORDER BY i.created_at DESC, i.id DESC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, email], |row| {
                    let invite = InviteRow::from_row(row)?;
                    let project = ProjectRow {
                        id: row.get(8)?,
                        name: row.get(9)?,
                        description: row.get(10)?,
                        owner_id: row.get(11)?,
                        is_archived: row.get(12)?,
                        archived_at: row.get(13)?,
                        deadline: row.get(14)?,
                        created_at: row.get(15)?,
                    };
                    let inviter = UserRow {
                        id: row.get(16)?,
                        email: row.get(17)?,
                        display_name: row.get(18)?,
                        picture: row.get(19)?,
                        created_at: row.get(20)?,
                    };
                    Ok((invite, project, inviter))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn get_invite(&self, id: i64) -> StoreResult<Option<InviteRow>> {
        self.with_conn(|conn| Ok(query_invite(conn, id)?))
    }

    /// Drive the invite state machine. Both transitions are terminal:
    ///
    /// ```text
    /// pending --accept--> accepted
    /// pending --decline--> declined
    /// ```
    ///
    /// The addressee check matches by linked user id when set, else by email;
    /// an email match links the row to the actor as a side effect. Accepting
    /// also ensures the membership row. Everything — status re-check, update,
    /// link, membership insert — runs in one transaction, so a concurrent
    /// second accept observes a non-pending row and fails with Conflict
    /// instead of double-applying.
    pub fn respond_invite(
        &self,
        invite_id: i64,
        actor: &UserRow,
        accept: bool,
    ) -> StoreResult<InviteRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let invite = query_invite(&tx, invite_id)?
                .ok_or_else(|| StoreError::NotFound("Invite not found.".into()))?;

            let addressed_to_actor = match invite.invited_user_id {
                Some(uid) => uid == actor.id,
                None => invite.invited_email == actor.email.to_lowercase(),
            };
            if !addressed_to_actor {
                return Err(StoreError::Forbidden("This invite is not for you.".into()));
            }

            if invite.status != InviteStatus::Pending {
                return Err(StoreError::Conflict(format!(
                    "Invite already {}.",
                    invite.status
                )));
            }

            let status = if accept {
                InviteStatus::Accepted
            } else {
                InviteStatus::Declined
            };

            // Guarded by status = 'pending' so a racing writer that slipped
            // past the read above updates zero rows.
            let affected = tx.execute(
                "UPDATE project_invites
                 SET status = ?1, responded_at = ?2, invited_user_id = ?3
                 WHERE id = ?4 AND status = 'pending'",
                rusqlite::params![status.as_str(), Utc::now(), actor.id, invite_id],
            )?;
            if affected == 0 {
                return Err(StoreError::Conflict("Invite already responded to.".into()));
            }

            if accept {
                insert_participant(&tx, invite.project_id, actor.id)?;
            }

            let updated = query_invite(&tx, invite_id)?
                .ok_or_else(|| StoreError::NotFound("Invite not found.".into()))?;

            tx.commit()?;
            Ok(updated)
        })
    }
}

fn query_invite(conn: &Connection, id: i64) -> rusqlite::Result<Option<InviteRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM project_invites WHERE id = ?1",
        InviteRow::COLUMNS
    ))?;
    stmt.query_row([id], InviteRow::from_row).optional()
}

#[cfg(test)]
mod tests {
    use proofdeck_types::models::{InviteStatus, Role};

    use crate::models::UserRow;
    use crate::{Database, StoreError};

    fn setup() -> (Database, i64, UserRow) {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner@example.com", Some("Owner"), None).unwrap();
        let project = db.create_project(owner.id, "Launch", None, None).unwrap();
        (db, project.id, owner)
    }

    #[test]
    fn create_resolves_existing_user() {
        let (db, project_id, owner) = setup();
        let existing = db.create_user("b@example.com", None, None).unwrap();

        let invite = db.create_invite(project_id, "b@example.com", owner.id).unwrap();
        assert_eq!(invite.status, InviteStatus::Pending);
        assert_eq!(invite.invited_user_id, Some(existing.id));

        let unresolved = db.create_invite(project_id, "new@example.com", owner.id).unwrap();
        assert_eq!(unresolved.invited_user_id, None);
    }

    #[test]
    fn duplicate_pending_is_a_conflict() {
        let (db, project_id, owner) = setup();
        db.create_invite(project_id, "b@example.com", owner.id).unwrap();
        let err = db
            .create_invite(project_id, "b@example.com", owner.id)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn reinvite_after_decline_succeeds() {
        let (db, project_id, owner) = setup();
        let bee = db.create_user("b@example.com", None, None).unwrap();

        let first = db.create_invite(project_id, "b@example.com", owner.id).unwrap();
        let declined = db.respond_invite(first.id, &bee, false).unwrap();
        assert_eq!(declined.status, InviteStatus::Declined);
        assert!(declined.responded_at.is_some());

        // the declined row is history, it no longer blocks the pair
        db.create_invite(project_id, "b@example.com", owner.id).unwrap();
    }

    #[test]
    fn accept_grants_membership() {
        let (db, project_id, owner) = setup();
        let bee = db.create_user("b@example.com", None, None).unwrap();
        let invite = db.create_invite(project_id, "b@example.com", owner.id).unwrap();

        let accepted = db.respond_invite(invite.id, &bee, true).unwrap();
        assert_eq!(accepted.status, InviteStatus::Accepted);
        assert!(accepted.responded_at.is_some());
        assert_eq!(db.resolve_role(project_id, bee.id).unwrap(), Role::Collaborator);
    }

    #[test]
    fn second_accept_is_a_conflict_with_single_membership() {
        let (db, project_id, owner) = setup();
        let bee = db.create_user("b@example.com", None, None).unwrap();
        let invite = db.create_invite(project_id, "b@example.com", owner.id).unwrap();

        db.respond_invite(invite.id, &bee, true).unwrap();
        let err = db.respond_invite(invite.id, &bee, true).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        assert_eq!(db.list_participants(project_id).unwrap().len(), 1);
    }

    #[test]
    fn accept_with_existing_membership_is_idempotent() {
        let (db, project_id, owner) = setup();
        let bee = db.create_user("b@example.com", None, None).unwrap();

        let first = db.create_invite(project_id, "b@example.com", owner.id).unwrap();
        db.respond_invite(first.id, &bee, true).unwrap();

        // a second invite to an existing member still accepts cleanly
        let second = db.create_invite(project_id, "b@example.com", owner.id).unwrap();
        db.respond_invite(second.id, &bee, true).unwrap();
        assert_eq!(db.list_participants(project_id).unwrap().len(), 1);
    }

    #[test]
    fn wrong_addressee_is_forbidden() {
        let (db, project_id, owner) = setup();
        let interloper = db.create_user("x@example.com", None, None).unwrap();
        let invite = db.create_invite(project_id, "b@example.com", owner.id).unwrap();

        let err = db.respond_invite(invite.id, &interloper, true).unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[test]
    fn email_match_links_the_actor() {
        let (db, project_id, owner) = setup();
        // invite sent before the account exists
        let invite = db.create_invite(project_id, "late@example.com", owner.id).unwrap();
        assert_eq!(invite.invited_user_id, None);

        let late = db.create_user("late@example.com", None, None).unwrap();
        let accepted = db.respond_invite(invite.id, &late, true).unwrap();
        assert_eq!(accepted.invited_user_id, Some(late.id));
    }

    #[test]
    fn pending_listing_uses_dual_match() {
        let (db, project_id, owner) = setup();
        // one invite pre-dates the account (matched by email), one is linked
        let unlinked = db.create_invite(project_id, "dual@example.com", owner.id).unwrap();
        let dual = db.create_user("dual@example.com", None, None).unwrap();

        let second_project = db.create_project(owner.id, "Second", None, None).unwrap();
        let linked = db
            .create_invite(second_project.id, "dual@example.com", owner.id)
            .unwrap();
        assert_eq!(linked.invited_user_id, Some(dual.id));

        let pending = db
            .list_pending_invites_for(dual.id, "dual@example.com")
            .unwrap();
        let ids: Vec<i64> = pending.iter().map(|(i, _, _)| i.id).collect();
        assert_eq!(pending.len(), 2);
        assert!(ids.contains(&unlinked.id) && ids.contains(&linked.id));

        // embedded detail is usable for rendering
        let (_, project, inviter) = &pending[0];
        assert_eq!(inviter.id, owner.id);
        assert!(project.id == project_id || project.id == second_project.id);
    }

    #[test]
    fn responded_invites_disappear_from_pending() {
        let (db, project_id, owner) = setup();
        let bee = db.create_user("b@example.com", None, None).unwrap();
        let invite = db.create_invite(project_id, "b@example.com", owner.id).unwrap();

        db.respond_invite(invite.id, &bee, false).unwrap();
        assert!(db
            .list_pending_invites_for(bee.id, "b@example.com")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_invite_is_not_found() {
        let (db, _, owner) = setup();
        let err = db.respond_invite(999, &owner, true).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
