//! v001 -- Initial schema creation.
//!
//! Creates the user aggregate and its append-only children:
//! `notifications`, `points_history`, `achievements` and `processed_events`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id                    TEXT PRIMARY KEY NOT NULL,
    role                  TEXT NOT NULL,               -- volunteer | organization | admin
    display_name          TEXT,
    points                INTEGER NOT NULL DEFAULT 0,
    season_points         INTEGER NOT NULL DEFAULT 0,
    current_level         INTEGER NOT NULL DEFAULT 1,
    frame_path            TEXT,
    current_group_id      TEXT,
    current_season_id     TEXT,
    notification_settings TEXT NOT NULL DEFAULT '{}',  -- JSON: category -> bool
    push_token            TEXT,
    achievements_count    INTEGER NOT NULL DEFAULT 0,
    created_at            TEXT NOT NULL                -- RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

-- ----------------------------------------------------------------
-- Notification records (in-app inbox)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id        TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    user_id   TEXT NOT NULL,                  -- FK -> users(id)
    title     TEXT NOT NULL,
    body      TEXT NOT NULL,
    category  TEXT NOT NULL,
    data      TEXT NOT NULL DEFAULT '{}',     -- JSON: string -> string
    is_read   INTEGER NOT NULL DEFAULT 0,     -- boolean 0/1
    timestamp TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_ts
    ON notifications(user_id, timestamp DESC);

-- ----------------------------------------------------------------
-- Points transactions (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS points_history (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_id      TEXT NOT NULL,
    amount       INTEGER NOT NULL,
    reason       TEXT NOT NULL,
    total_points INTEGER NOT NULL,
    timestamp    TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_points_history_user_ts
    ON points_history(user_id, timestamp);

-- ----------------------------------------------------------------
-- Achievement unlocks, one per (user, achievement)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS achievements (
    user_id        TEXT NOT NULL,
    achievement_id TEXT NOT NULL,
    unlocked_at    TEXT NOT NULL,
    dialog_shown   INTEGER NOT NULL DEFAULT 0,

    PRIMARY KEY (user_id, achievement_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Processed-event markers, one per (user, source event)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS processed_events (
    user_id      TEXT NOT NULL,
    event_id     TEXT NOT NULL,
    processed_at TEXT NOT NULL,

    PRIMARY KEY (user_id, event_id)
);

CREATE INDEX IF NOT EXISTS idx_processed_events_user_ts
    ON processed_events(user_id, processed_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
