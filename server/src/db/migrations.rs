use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking: no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: Messages

CREATE TABLE messages (
    id TEXT PRIMARY KEY,
    from_user_id TEXT NOT NULL,
    to_user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    has_attachment INTEGER NOT NULL DEFAULT 0,
    attachment_meta TEXT,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX idx_messages_pair ON messages(from_user_id, to_user_id);
CREATE INDEX idx_messages_unread ON messages(to_user_id, from_user_id, is_read);
",
    )])
}
