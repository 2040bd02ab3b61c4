//! v003 -- Achievement reward outbox and project tasks.
//!
//! Unlocks recorded before this version were already rewarded, so they are
//! marked as such.

use rusqlite::Connection;

const UP_SQL: &str = r#"
ALTER TABLE achievements ADD COLUMN rewarded INTEGER NOT NULL DEFAULT 0;  -- boolean 0/1
UPDATE achievements SET rewarded = 1;

CREATE INDEX IF NOT EXISTS idx_achievements_unrewarded
    ON achievements(rewarded, unlocked_at);

-- Project tasks, the slice read by the deadline reminder sweep
CREATE TABLE IF NOT EXISTS project_tasks (
    project_id             TEXT NOT NULL,
    task_id                TEXT NOT NULL,
    project_title          TEXT NOT NULL,
    task_title             TEXT NOT NULL,
    organizer_id           TEXT,
    status                 TEXT NOT NULL,          -- open | in_progress | completed | confirmed
    deadline               TEXT,                   -- RFC-3339
    assigned_volunteer_ids TEXT NOT NULL DEFAULT '[]',  -- JSON array

    PRIMARY KEY (project_id, task_id)
);

CREATE INDEX IF NOT EXISTS idx_project_tasks_deadline ON project_tasks(deadline);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
