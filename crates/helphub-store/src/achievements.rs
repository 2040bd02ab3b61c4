use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{format_timestamp, parse_timestamp, Database};
use crate::error::Result;
use crate::models::AchievementUnlock;

impl Database {
    /// Create the unlock record unless it already exists.
    ///
    /// Returns `true` only when a new row was written.
    pub fn insert_achievement_unlock(
        &self,
        user_id: &str,
        achievement_id: &str,
        unlocked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO achievements (user_id, achievement_id, unlocked_at, dialog_shown)
             VALUES (?1, ?2, ?3, 0)",
            params![user_id, achievement_id, format_timestamp(&unlocked_at)],
        )?;
        Ok(affected > 0)
    }

    pub fn list_achievements(&self, user_id: &str) -> Result<Vec<AchievementUnlock>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, achievement_id, unlocked_at, dialog_shown, rewarded
             FROM achievements
             WHERE user_id = ?1
             ORDER BY unlocked_at, achievement_id",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_unlock)?;

        let mut unlocks = Vec::new();
        for row in rows {
            unlocks.push(row?);
        }
        Ok(unlocks)
    }

    /// Unlocks whose points reward has not been credited yet, oldest first.
    pub fn unrewarded_achievements(&self) -> Result<Vec<AchievementUnlock>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, achievement_id, unlocked_at, dialog_shown, rewarded
             FROM achievements
             WHERE rewarded = 0
             ORDER BY unlocked_at, user_id, achievement_id",
        )?;
        let rows = stmt.query_map([], row_to_unlock)?;

        let mut unlocks = Vec::new();
        for row in rows {
            unlocks.push(row?);
        }
        Ok(unlocks)
    }

    pub fn achievement_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT achievement_id FROM achievements WHERE user_id = ?1 ORDER BY achievement_id")?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    pub fn count_achievements(&self, user_id: &str) -> Result<u32> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM achievements WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn mark_dialog_shown(&self, user_id: &str, achievement_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE achievements SET dialog_shown = 1 WHERE user_id = ?1 AND achievement_id = ?2",
            params![user_id, achievement_id],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_unlock(row: &rusqlite::Row<'_>) -> rusqlite::Result<AchievementUnlock> {
    let unlocked_at: String = row.get(2)?;
    Ok(AchievementUnlock {
        user_id: row.get(0)?,
        achievement_id: row.get(1)?,
        unlocked_at: parse_timestamp(2, &unlocked_at)?,
        dialog_shown: row.get(3)?,
        rewarded: row.get(4)?,
    })
}
