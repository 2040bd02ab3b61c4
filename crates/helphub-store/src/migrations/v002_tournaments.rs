use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Tournament groups, one row per (season, group)
CREATE TABLE IF NOT EXISTS tournament_groups (
    season_id    TEXT NOT NULL,               -- YYYY-MM
    group_id     TEXT NOT NULL,               -- group_<n>
    group_number INTEGER NOT NULL,
    user_ids     TEXT NOT NULL,               -- JSON array, formation snapshot
    created_at   TEXT NOT NULL,

    PRIMARY KEY (season_id, group_id)
);

CREATE INDEX IF NOT EXISTS idx_users_group ON users(current_season_id, current_group_id);

-- Medals, append-only
CREATE TABLE IF NOT EXISTS medals (
    id                 TEXT PRIMARY KEY NOT NULL,  -- <season>_<group>_<place>
    user_id            TEXT NOT NULL,
    season_id          TEXT NOT NULL,
    tier               TEXT NOT NULL,              -- gold | silver | bronze
    place              INTEGER NOT NULL,
    icon_path          TEXT,
    awarded_at         TEXT NOT NULL,
    group_number       INTEGER NOT NULL,
    total_participants INTEGER NOT NULL,
    season_points      INTEGER NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_medals_user ON medals(user_id, awarded_at);

-- Calendar events, the slice read by the daily sweeps
CREATE TABLE IF NOT EXISTS events (
    id              TEXT PRIMARY KEY NOT NULL,
    name            TEXT NOT NULL,
    organizer_id    TEXT,
    starts_at       TEXT NOT NULL,
    participant_ids TEXT NOT NULL DEFAULT '[]'  -- JSON array
);

CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
