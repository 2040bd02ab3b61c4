use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{format_timestamp, parse_timestamp, Database};
use crate::error::Result;

impl Database {
    /// Record that `event_id` was credited to `user_id` at `at`.
    ///
    /// Returns `false` when the marker already existed, in which case the
    /// stored time is left untouched. Crediting paths take the marker inside
    /// the points transaction instead (see [`Database::update_points_once`]).
    pub fn mark_event_processed_at(
        &self,
        user_id: &str,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO processed_events (user_id, event_id, processed_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, event_id, format_timestamp(&at)],
        )?;
        Ok(affected > 0)
    }

    pub fn count_processed_events(&self, user_id: &str) -> Result<u32> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM processed_events WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Processing times at or after `since`, oldest first.
    pub fn processed_event_times_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn().prepare(
            "SELECT processed_at FROM processed_events
             WHERE user_id = ?1 AND processed_at >= ?2
             ORDER BY processed_at",
        )?;
        let rows = stmt.query_map(params![user_id, format_timestamp(&since)], |row| {
            let ts: String = row.get(0)?;
            parse_timestamp(0, &ts)
        })?;

        let mut times = Vec::new();
        for row in rows {
            times.push(row?);
        }
        Ok(times)
    }
}
