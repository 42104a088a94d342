use chrono::Utc;
use rusqlite::Connection;

use proofdeck_types::models::ActivityKind;

use crate::models::{AssetRow, OptionalExt};
use crate::queries::activity::insert_activity;
use crate::{Database, StoreError, StoreResult};

impl Database {
    /// Register an uploaded asset. The version number is the count of the
    /// project's existing assets plus one, computed inside the same
    /// transaction as the insert so concurrent uploads serialize with no
    /// gaps or repeats. The `asset_uploaded` activity row lands in the same
    /// transaction.
    pub fn insert_asset(
        &self,
        project_id: i64,
        user_id: i64,
        file_path: &str,
        actor_label: &str,
    ) -> StoreResult<AssetRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM assets WHERE project_id = ?1",
                [project_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO assets (project_id, user_id, file_path, version, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![project_id, user_id, file_path, count + 1, Utc::now()],
            )?;
            let id = tx.last_insert_rowid();

            insert_activity(
                &tx,
                project_id,
                user_id,
                ActivityKind::AssetUploaded,
                &format!("{actor_label} uploaded an asset."),
            )?;

            let asset = query_asset(&tx, id)?
                .ok_or_else(|| StoreError::NotFound("Asset not found".into()))?;

            tx.commit()?;
            Ok(asset)
        })
    }

    pub fn get_asset(&self, id: i64) -> StoreResult<Option<AssetRow>> {
        self.with_conn(|conn| Ok(query_asset(conn, id)?))
    }

    pub fn list_assets(&self, project_id: i64) -> StoreResult<Vec<AssetRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM assets WHERE project_id = ?1
                 ORDER BY created_at DESC, id DESC",
                AssetRow::COLUMNS
            ))?;
            let rows = stmt
                .query_map([project_id], AssetRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Delete an asset with its comments and their reactions. Version
    /// numbers of surviving assets are not renumbered; a later upload
    /// continues from the current count.
    pub fn delete_asset(&self, id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if query_asset(&tx, id)?.is_none() {
                return Err(StoreError::NotFound("Asset not found".into()));
            }

            tx.execute(
                "DELETE FROM comment_reactions WHERE comment_id IN (
                     SELECT id FROM comments WHERE asset_id = ?1
                 )",
                [id],
            )?;
            tx.execute("DELETE FROM comments WHERE asset_id = ?1", [id])?;
            tx.execute("DELETE FROM assets WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(())
        })
    }
}

fn query_asset(conn: &Connection, id: i64) -> rusqlite::Result<Option<AssetRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM assets WHERE id = ?1",
        AssetRow::COLUMNS
    ))?;
    stmt.query_row([id], AssetRow::from_row).optional()
}
