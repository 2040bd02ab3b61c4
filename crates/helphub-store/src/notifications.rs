use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{conversion_error, format_timestamp, parse_enum, parse_json, parse_timestamp, Database};
use crate::error::Result;
use crate::models::NotificationRecord;

impl Database {
    /// Write a batch of notification records in a single transaction.
    ///
    /// Every record is stamped with the same store-assigned timestamp,
    /// overriding whatever the caller put there.
    pub fn insert_notifications(&mut self, records: &[NotificationRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let stamp = format_timestamp(&Utc::now());
        let tx = self.conn_mut().transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO notifications (id, user_id, title, body, category, data, is_read, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.id.to_string(),
                    record.user_id,
                    record.title,
                    record.body,
                    record.category.as_str(),
                    serde_json::to_string(&record.data)?,
                    record.is_read,
                    stamp,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(count = records.len(), "notification batch committed");
        Ok(records.len())
    }

    /// Newest first.
    pub fn list_notifications(&self, user_id: &str, limit: u32) -> Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, title, body, category, data, is_read, timestamp
             FROM notifications
             WHERE user_id = ?1
             ORDER BY timestamp DESC, id
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit], row_to_notification)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRecord> {
    let id: String = row.get(0)?;
    let category: String = row.get(4)?;
    let data: String = row.get(5)?;
    let timestamp: String = row.get(7)?;

    Ok(NotificationRecord {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        category: parse_enum(4, &category)?,
        data: parse_json(5, &data)?,
        is_read: row.get(6)?,
        timestamp: parse_timestamp(7, &timestamp)?,
    })
}
