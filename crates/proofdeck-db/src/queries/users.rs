use chrono::Utc;
use rusqlite::Connection;

use crate::error::is_unique_violation;
use crate::models::{OptionalExt, UserRow};
use crate::{Database, StoreError, StoreResult};

impl Database {
    /// Emails are stored lowercased; lookups normalize the same way.
    pub fn create_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        picture: Option<&str>,
    ) -> StoreResult<UserRow> {
        let email = email.trim().to_lowercase();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, display_name, picture, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![email, display_name, picture, Utc::now()],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict("A user with this email already exists.".into())
                } else {
                    e.into()
                }
            })?;

            let id = conn.last_insert_rowid();
            query_user_by_id(conn, id)?
                .ok_or_else(|| StoreError::NotFound("User not found".into()))
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| Ok(query_user_by_id(conn, id)?))
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let email = email.trim().to_lowercase();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users WHERE email = ?1",
                UserRow::COLUMNS
            ))?;
            Ok(stmt.query_row([&email], UserRow::from_row).optional()?)
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE id = ?1",
        UserRow::COLUMNS
    ))?;
    stmt.query_row([id], UserRow::from_row).optional()
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn email_is_normalized_on_create() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("  Ana@Example.COM ", Some("Ana"), None).unwrap();
        assert_eq!(user.email, "ana@example.com");

        let found = db.get_user_by_email("ANA@example.com").unwrap();
        assert_eq!(found.unwrap().id, user.id);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("b@example.com", None, None).unwrap();
        let err = db.create_user("B@example.com", None, None).unwrap_err();
        assert!(matches!(err, crate::StoreError::Conflict(_)));
    }

    #[test]
    fn label_falls_back_to_email() {
        let db = Database::open_in_memory().unwrap();
        let named = db.create_user("c@example.com", Some("Cam"), None).unwrap();
        let anon = db.create_user("d@example.com", None, None).unwrap();
        assert_eq!(named.label(), "Cam");
        assert_eq!(anon.label(), "d@example.com");
    }
}
