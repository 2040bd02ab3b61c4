use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::{format_timestamp, parse_json, parse_timestamp, Database};
use crate::error::Result;
use crate::models::CalendarEvent;

impl Database {
    pub fn upsert_event(&self, event: &CalendarEvent) -> Result<()> {
        self.conn().execute(
            "INSERT INTO events (id, name, organizer_id, starts_at, participant_ids)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 organizer_id = excluded.organizer_id,
                 starts_at = excluded.starts_at,
                 participant_ids = excluded.participant_ids",
            params![
                event.id,
                event.name,
                event.organizer_id,
                format_timestamp(&event.starts_at),
                serde_json::to_string(&event.participant_ids)?,
            ],
        )?;
        Ok(())
    }

    pub fn set_event_participants(&self, event_id: &str, participant_ids: &[String]) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE events SET participant_ids = ?2 WHERE id = ?1",
            params![event_id, serde_json::to_string(participant_ids)?],
        )?;
        Ok(affected > 0)
    }

    pub fn get_event(&self, event_id: &str) -> Result<Option<CalendarEvent>> {
        let event = self
            .conn()
            .query_row(
                "SELECT id, name, organizer_id, starts_at, participant_ids
                 FROM events WHERE id = ?1",
                params![event_id],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// Events with `from <= starts_at < to`, ordered by start time.
    pub fn events_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, organizer_id, starts_at, participant_ids
             FROM events
             WHERE starts_at >= ?1 AND starts_at < ?2
             ORDER BY starts_at, id",
        )?;
        let rows = stmt.query_map(
            params![format_timestamp(&from), format_timestamp(&to)],
            row_to_event,
        )?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<CalendarEvent> {
    let starts_at: String = row.get(3)?;
    let participant_ids: String = row.get(4)?;

    Ok(CalendarEvent {
        id: row.get(0)?,
        name: row.get(1)?,
        organizer_id: row.get(2)?,
        starts_at: parse_timestamp(3, &starts_at)?,
        participant_ids: parse_json(4, &participant_ids)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(id: &str, starts_at: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            name: format!("Event {id}"),
            organizer_id: Some("org".into()),
            starts_at,
            participant_ids: vec!["a".into()],
        }
    }

    #[test]
    fn range_is_half_open() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let day = Utc.with_ymd_and_hms(2026, 10, 17, 22, 0, 0).unwrap();
        db.upsert_event(&event("inside", day + chrono::Duration::hours(3)))
            .unwrap();
        db.upsert_event(&event("edge", day + chrono::Duration::days(1)))
            .unwrap();
        db.upsert_event(&event("start", day)).unwrap();

        let found = db
            .events_starting_between(day, day + chrono::Duration::days(1))
            .unwrap();
        let ids: Vec<_> = found.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "inside"]);
    }

    #[test]
    fn participants_update() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        db.upsert_event(&event("e1", Utc::now())).unwrap();

        assert!(db
            .set_event_participants("e1", &["a".into(), "b".into()])
            .unwrap());
        assert!(!db.set_event_participants("missing", &[]).unwrap());
        let loaded = db.get_event("e1").unwrap().unwrap();
        assert_eq!(loaded.participant_ids, vec!["a", "b"]);
        assert!(db.get_event("missing").unwrap().is_none());
    }
}
