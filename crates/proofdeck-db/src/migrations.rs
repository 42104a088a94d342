use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            email           TEXT NOT NULL UNIQUE,
            display_name    TEXT,
            picture         TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            description     TEXT,
            owner_id        INTEGER NOT NULL REFERENCES users(id),
            is_archived     INTEGER NOT NULL DEFAULT 0,
            archived_at     TEXT,
            deadline        TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_projects_owner
            ON projects(owner_id);

        -- Membership facts. The owner is derived from projects.owner_id and
        -- must never appear here.
        CREATE TABLE IF NOT EXISTS project_participants (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id      INTEGER NOT NULL REFERENCES projects(id),
            user_id         INTEGER NOT NULL REFERENCES users(id),
            role            TEXT NOT NULL DEFAULT 'member',
            created_at      TEXT NOT NULL,
            UNIQUE(project_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS project_invites (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id      INTEGER NOT NULL REFERENCES projects(id),
            invited_email   TEXT NOT NULL,
            invited_user_id INTEGER REFERENCES users(id),
            invited_by_id   INTEGER NOT NULL REFERENCES users(id),
            status          TEXT NOT NULL DEFAULT 'pending',
            created_at      TEXT NOT NULL,
            responded_at    TEXT
        );

        -- At most one pending invite per (project, email); accepted and
        -- declined rows are history and do not block a re-invite.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_invites_pending_unique
            ON project_invites(project_id, invited_email)
            WHERE status = 'pending';

        CREATE INDEX IF NOT EXISTS idx_invites_email
            ON project_invites(invited_email);

        CREATE TABLE IF NOT EXISTS assets (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id      INTEGER NOT NULL REFERENCES projects(id),
            user_id         INTEGER NOT NULL REFERENCES users(id),
            file_path       TEXT NOT NULL,
            version         INTEGER NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_assets_project
            ON assets(project_id, created_at);

        -- parent_id is a weak reference, not a foreign key: deleting a
        -- comment leaves its children addressable with a dangling parent.
        CREATE TABLE IF NOT EXISTS comments (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_id        INTEGER NOT NULL REFERENCES assets(id),
            user_id         INTEGER NOT NULL REFERENCES users(id),
            content         TEXT NOT NULL,
            parent_id       INTEGER,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_asset
            ON comments(asset_id, created_at);

        CREATE TABLE IF NOT EXISTS comment_reactions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            comment_id      INTEGER NOT NULL REFERENCES comments(id),
            user_id         INTEGER NOT NULL REFERENCES users(id),
            emoji           TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            UNIQUE(comment_id, user_id, emoji)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_comment
            ON comment_reactions(comment_id);

        CREATE TABLE IF NOT EXISTS activities (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id      INTEGER NOT NULL REFERENCES projects(id),
            user_id         INTEGER NOT NULL REFERENCES users(id),
            type            TEXT NOT NULL,
            message         TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_activities_project
            ON activities(project_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
