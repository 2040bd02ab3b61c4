//! Daily sweeps over the calendar.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use helphub_shared::constants::POINTS_EVENT_PARTICIPATION;
use helphub_shared::{NotificationCategory, Payload};
use helphub_store::PointsClaim;

use crate::dispatcher::Notification;
use crate::error::Result;
use crate::ledger::PointsOutcome;
use crate::Engine;

/// Deadline reminders cover the rest of today and the next three days.
const DEADLINE_LOOKAHEAD_DAYS: i64 = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub events: usize,
    /// Participations credited for the first time.
    pub credited: usize,
    /// Participations that errored; the next sweep retries them.
    pub failed: usize,
}

/// UTC instant of local midnight at the start of `date`.
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset.local_minus_utc()))))
}

impl Engine {
    /// Credit one participant for one finished event.
    ///
    /// The processed-event marker and the points are committed together, so
    /// a failure leaves the participation uncredited for the next sweep.
    /// Returns `false` when the participation was already credited or the
    /// user cannot earn points.
    pub async fn process_completed_event(&self, user_id: &str, event_id: &str) -> Result<bool> {
        let outcome = self
            .ledger
            .apply_points_once(
                user_id,
                PointsClaim::ProcessedEvent(event_id),
                POINTS_EVENT_PARTICIPATION,
                "Event participation",
            )
            .await?;
        if !matches!(outcome, PointsOutcome::Applied { .. }) {
            debug!(user = %user_id, event = %event_id, ?outcome, "participation not credited");
            return Ok(false);
        }

        let count = self.db.lock().await.count_processed_events(user_id)?;
        self.achievements.check_event_achievements(user_id, count).await?;
        self.achievements.check_marathoner(user_id, Utc::now()).await?;
        Ok(true)
    }

    /// Credit the participants of every event that started yesterday.
    ///
    /// A participant that fails is logged and counted; the others are still
    /// credited.
    pub async fn sweep_completed_events(&self, today: NaiveDate, offset: FixedOffset) -> Result<SweepSummary> {
        let to = local_midnight(today, offset);
        let from = to - Duration::days(1);
        let events = self.db.lock().await.events_starting_between(from, to)?;

        let mut summary = SweepSummary {
            events: events.len(),
            ..SweepSummary::default()
        };
        for event in &events {
            for participant in &event.participant_ids {
                match self.process_completed_event(participant, &event.id).await {
                    Ok(true) => summary.credited += 1,
                    Ok(false) => {}
                    Err(e) => {
                        error!(user = %participant, event = %event.id, error = %e, "failed to credit participation");
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            events = summary.events,
            credited = summary.credited,
            failed = summary.failed,
            "completed events processed"
        );
        Ok(summary)
    }

    /// Remind participants of events starting tomorrow. Returns the number
    /// of events a reminder went out for.
    pub async fn send_event_reminders(&self, today: NaiveDate, offset: FixedOffset) -> Result<usize> {
        let from = local_midnight(today, offset) + Duration::days(1);
        let to = from + Duration::days(1);
        let events = self.db.lock().await.events_starting_between(from, to)?;

        let mut reminded = 0;
        for event in events.iter().filter(|e| !e.participant_ids.is_empty()) {
            let notification = Notification::new(
                NotificationCategory::EventReminder,
                "Event reminder",
                format!("\"{}\" takes place tomorrow. See you there!", event.name),
            )
            .with_payload(
                Payload::new()
                    .with("eventId", &event.id)
                    .with("reminderType", "upcoming")
                    .with("eventTime", event.starts_at.to_rfc3339()),
            );
            self.dispatcher
                .dispatch(&event.participant_ids, &notification)
                .await?;
            reminded += 1;
        }

        info!(events = reminded, "event reminders sent");
        Ok(reminded)
    }

    /// Remind assignees of unfinished tasks due between `now` and the end of
    /// the third local day after today. Returns the number of tasks reminded.
    pub async fn send_deadline_reminders(&self, now: DateTime<Utc>, offset: FixedOffset) -> Result<usize> {
        let today = now.with_timezone(&offset).date_naive();
        let to = local_midnight(today, offset) + Duration::days(DEADLINE_LOOKAHEAD_DAYS);
        let tasks = self.db.lock().await.tasks_due_between(now, to)?;

        let mut reminded = 0;
        for task in tasks.iter().filter(|t| !t.assigned_volunteer_ids.is_empty()) {
            let Some(deadline) = task.deadline else {
                continue;
            };
            let notification = Notification::new(
                NotificationCategory::ProjectDeadline,
                "Task deadline reminder",
                format!(
                    "Task \"{}\" in project \"{}\" is due by {}",
                    task.task_title,
                    task.project_title,
                    deadline.with_timezone(&offset).format("%-d %B %Y, %H:%M"),
                ),
            )
            .with_payload(
                Payload::new()
                    .with("projectId", &task.project_id)
                    .with("taskId", &task.task_id)
                    .with("deadline", deadline.to_rfc3339()),
            );
            self.dispatcher
                .dispatch(&task.assigned_volunteer_ids, &notification)
                .await?;
            reminded += 1;
        }

        info!(tasks = reminded, "deadline reminders sent");
        Ok(reminded)
    }
}
