use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{conversion_error, format_timestamp, parse_timestamp, Database};
use crate::error::Result;
use crate::models::PointsTransaction;

impl Database {
    /// Append one entry to a user's points history.
    pub fn insert_points_transaction(
        &self,
        user_id: &str,
        amount: i64,
        reason: &str,
        total_points: i64,
    ) -> Result<PointsTransaction> {
        let tx = PointsTransaction {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            amount,
            reason: reason.to_string(),
            total_points,
            timestamp: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO points_history (id, user_id, amount, reason, total_points, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tx.id.to_string(),
                tx.user_id,
                tx.amount,
                tx.reason,
                tx.total_points,
                format_timestamp(&tx.timestamp),
            ],
        )?;
        Ok(tx)
    }

    /// Oldest first.
    pub fn list_points_history(&self, user_id: &str) -> Result<Vec<PointsTransaction>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, amount, reason, total_points, timestamp
             FROM points_history
             WHERE user_id = ?1
             ORDER BY timestamp, rowid",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let id: String = row.get(0)?;
            let timestamp: String = row.get(5)?;
            Ok(PointsTransaction {
                id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?,
                user_id: row.get(1)?,
                amount: row.get(2)?,
                reason: row.get(3)?,
                total_points: row.get(4)?,
                timestamp: parse_timestamp(5, &timestamp)?,
            })
        })?;

        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }
}
