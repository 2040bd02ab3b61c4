//! Periodic jobs.
//!
//! One tokio task per job sleeps until the next local fire time, runs the
//! job and goes back to sleep. A failed run is logged; the next tick is the
//! retry.

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info};

use helphub_engine::sweeps::local_midnight;
use helphub_engine::{Engine, Result};

use crate::config::ServerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Formation,
    Settlement,
    CompletedEvents,
    EventReminders,
    DeadlineReminders,
}

impl Job {
    pub fn as_str(&self) -> &'static str {
        match self {
            Job::Formation => "formation",
            Job::Settlement => "settlement",
            Job::CompletedEvents => "completed-events",
            Job::EventReminders => "event-reminders",
            Job::DeadlineReminders => "deadline-reminders",
        }
    }

    /// Days of the month the job may fire on; `None` means every day.
    fn days(&self) -> Option<std::ops::RangeInclusive<u32>> {
        match self {
            Job::Formation => Some(1..=1),
            Job::Settlement => Some(28..=31),
            Job::CompletedEvents | Job::EventReminders | Job::DeadlineReminders => None,
        }
    }

    fn hour(&self, config: &ServerConfig) -> u32 {
        match self {
            Job::Formation => config.season_start_hour,
            Job::Settlement => config.season_end_hour,
            Job::CompletedEvents | Job::EventReminders | Job::DeadlineReminders => config.daily_job_hour,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Job {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "formation" => Ok(Job::Formation),
            "settlement" => Ok(Job::Settlement),
            "completed-events" => Ok(Job::CompletedEvents),
            "event-reminders" => Ok(Job::EventReminders),
            "deadline-reminders" => Ok(Job::DeadlineReminders),
            other => Err(format!("unknown job: {other}")),
        }
    }
}

/// Local calendar date of `now`.
pub fn local_today(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Run one job for the local date `today` and summarise what it did.
pub async fn run_job(
    engine: &Engine,
    job: Job,
    today: NaiveDate,
    offset: FixedOffset,
) -> Result<serde_json::Value> {
    let summary = match job {
        Job::Formation => json!(engine.tournament().form_groups(today).await?),
        Job::Settlement => match engine.tournament().settle_season(today).await? {
            Some(summary) => json!(summary),
            None => json!({ "skipped": "not the last day of the month" }),
        },
        Job::CompletedEvents => json!(engine.sweep_completed_events(today, offset).await?),
        Job::EventReminders => json!({ "events": engine.send_event_reminders(today, offset).await? }),
        Job::DeadlineReminders => {
            let from = sweep_start(today, Utc::now(), offset);
            json!({ "tasks": engine.send_deadline_reminders(from, offset).await? })
        }
    };
    Ok(summary)
}

/// `now` when `today` is the current local date, otherwise the local
/// midnight that starts `today`.
fn sweep_start(today: NaiveDate, now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    if local_today(now, offset) == today {
        now
    } else {
        local_midnight(today, offset)
    }
}

/// Next instant strictly after `now` at which `job` fires.
pub fn next_fire(job: Job, hour: u32, now: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    let mut date = local_today(now, offset);

    // Settlement can fire on day 31; look a little over a month ahead.
    for _ in 0..40 {
        let allowed = job.days().map_or(true, |days| days.contains(&date.day()));
        if allowed {
            let candidate = offset
                .from_local_datetime(&date.and_time(time))
                .single()?
                .with_timezone(&Utc);
            if candidate > now {
                return Some(candidate);
            }
        }
        date = date.succ_opt()?;
    }
    None
}

/// Spawn one task per job.
pub fn spawn_all(engine: Engine, config: &ServerConfig) -> Vec<JoinHandle<()>> {
    [
        Job::Formation,
        Job::Settlement,
        Job::CompletedEvents,
        Job::EventReminders,
        Job::DeadlineReminders,
    ]
    .into_iter()
    .map(|job| spawn_job(engine.clone(), job, job.hour(config), config.utc_offset()))
    .collect()
}

fn spawn_job(engine: Engine, job: Job, hour: u32, offset: FixedOffset) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let Some(at) = next_fire(job, hour, now, offset) else {
                error!(%job, hour, "could not compute next fire time, stopping job");
                return;
            };
            let wait = (at - now).to_std().unwrap_or(StdDuration::ZERO);
            info!(%job, at = %at, "next scheduled run");
            tokio::time::sleep(wait).await;

            let today = local_today(Utc::now(), offset);
            match run_job(&engine, job, today, offset).await {
                Ok(summary) => info!(%job, %summary, "scheduled job finished"),
                Err(e) => error!(%job, error = %e, "scheduled job failed"),
            }
        }
    })
}
