//! Achievement unlocks.
//!
//! [`AchievementEngine::unlock`] is idempotent: the unlock record is created
//! with `INSERT OR IGNORE`, and everything downstream (count, notification,
//! unlock event) only happens when a row was actually written. After any
//! new non-capstone unlock the capstone condition is re-evaluated in the
//! same call.
//!
//! Points for an unlock are not awarded here. Each new unlock is published
//! as an [`AchievementUnlocked`] event and a separate rewarder task
//! ([`spawn_unlock_rewards`]) feeds the ledger. The unlock row doubles as an
//! outbox: its `rewarded` flag flips in the points transaction, and the
//! rewarder drains rows still unrewarded when it starts.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use helphub_shared::achievements::{self, ATTENDANCE_LADDER, MARATHONER, SECRET_MASTER};
use helphub_shared::constants::{CAPSTONE_THRESHOLD, MARATHON_WEEKS_REQUIRED, MARATHON_WINDOW_DAYS};
use helphub_shared::{NotificationCategory, Payload};
use helphub_store::PointsClaim;

use crate::dispatcher::{Dispatcher, Notification};
use crate::error::Result;
use crate::ledger::{Ledger, PointsOutcome};
use crate::SharedDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockOutcome {
    Unlocked,
    AlreadyUnlocked,
    Ineligible,
    UserNotFound,
}

/// Published once per newly created unlock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementUnlocked {
    pub user_id: String,
    pub achievement_id: String,
}

#[derive(Clone)]
pub struct AchievementEngine {
    db: SharedDatabase,
    dispatcher: Dispatcher,
    unlocks: mpsc::UnboundedSender<AchievementUnlocked>,
}

impl AchievementEngine {
    pub fn new(
        db: SharedDatabase,
        dispatcher: Dispatcher,
        unlocks: mpsc::UnboundedSender<AchievementUnlocked>,
    ) -> Self {
        Self {
            db,
            dispatcher,
            unlocks,
        }
    }

    pub async fn unlock(&self, user_id: &str, achievement_id: &str, title: &str) -> Result<UnlockOutcome> {
        let outcome = self.unlock_one(user_id, achievement_id, title).await?;
        if outcome == UnlockOutcome::Unlocked && achievement_id != SECRET_MASTER {
            self.check_secret_achievement(user_id).await?;
        }
        Ok(outcome)
    }

    /// Unlock the capstone when every other achievement is held.
    ///
    /// Returns `None` when the condition is not met.
    pub async fn check_secret_achievement(&self, user_id: &str) -> Result<Option<UnlockOutcome>> {
        let ids = self.db.lock().await.achievement_ids(user_id)?;
        if ids.iter().any(|id| id == SECRET_MASTER) {
            return Ok(None);
        }
        if ids.len() < CAPSTONE_THRESHOLD {
            return Ok(None);
        }

        let outcome = self
            .unlock_one(user_id, SECRET_MASTER, achievements::title_for(SECRET_MASTER))
            .await?;
        Ok(Some(outcome))
    }

    /// Unlock every attendance milestone reached by `processed_count`.
    /// Returns the ids that were newly unlocked.
    pub async fn check_event_achievements(
        &self,
        user_id: &str,
        processed_count: u32,
    ) -> Result<Vec<&'static str>> {
        let mut unlocked = Vec::new();
        for &(threshold, id) in ATTENDANCE_LADDER {
            if processed_count < threshold {
                break;
            }
            if self.unlock(user_id, id, achievements::title_for(id)).await? == UnlockOutcome::Unlocked {
                unlocked.push(id);
            }
        }
        Ok(unlocked)
    }

    /// Unlock the marathoner once processed events in the trailing window
    /// fall into enough distinct weeks.
    pub async fn check_marathoner(&self, user_id: &str, now: DateTime<Utc>) -> Result<Option<UnlockOutcome>> {
        let since = now - Duration::days(MARATHON_WINDOW_DAYS);
        let times = self
            .db
            .lock()
            .await
            .processed_event_times_since(user_id, since)?;

        let weeks: BTreeSet<u32> = times.iter().map(week_number).collect();
        debug!(user = %user_id, weeks = weeks.len(), "marathoner check");

        if weeks.len() < MARATHON_WEEKS_REQUIRED {
            return Ok(None);
        }
        let outcome = self
            .unlock(user_id, MARATHONER, achievements::title_for(MARATHONER))
            .await?;
        Ok(Some(outcome))
    }

    async fn unlock_one(&self, user_id: &str, achievement_id: &str, title: &str) -> Result<UnlockOutcome> {
        {
            let db = self.db.lock().await;
            let Some(user) = db.find_user(user_id)? else {
                return Ok(UnlockOutcome::UserNotFound);
            };
            if !user.role.is_point_eligible() {
                return Ok(UnlockOutcome::Ineligible);
            }
            if !db.insert_achievement_unlock(user_id, achievement_id, Utc::now())? {
                return Ok(UnlockOutcome::AlreadyUnlocked);
            }
            let count = db.count_achievements(user_id)?;
            db.set_achievements_count(user_id, count)?;
        }

        info!(user = %user_id, achievement = %achievement_id, "achievement unlocked");

        let event = AchievementUnlocked {
            user_id: user_id.to_string(),
            achievement_id: achievement_id.to_string(),
        };
        if self.unlocks.send(event).is_err() {
            warn!(
                user = %user_id,
                achievement = %achievement_id,
                "unlock reward channel closed, reward left pending"
            );
        }

        let notification = Notification::new(
            NotificationCategory::Achievement,
            "New achievement!",
            format!(
                "You earned the \"{title}\" achievement! {}",
                achievements::description_for(achievement_id)
            ),
        )
        .with_payload(
            Payload::new()
                .with("achievementId", achievement_id)
                .with("achievementTitle", title),
        );
        if let Err(e) = self.dispatcher.notify_user(user_id, &notification).await {
            warn!(user = %user_id, achievement = %achievement_id, error = %e, "achievement notification failed");
        }

        Ok(UnlockOutcome::Unlocked)
    }
}

/// Zero-based day of the year divided by seven.
///
/// Not ISO 8601: buckets restart on January 1st and the last one of the
/// year may be short.
pub fn week_number(ts: &DateTime<Utc>) -> u32 {
    ts.ordinal0() / 7
}

// ---------------------------------------------------------------------------
// Unlock rewards
// ---------------------------------------------------------------------------

/// Credit the catalog points for one unlock.
pub async fn reward_unlock(ledger: &Ledger, event: &AchievementUnlocked) -> Result<PointsOutcome> {
    let points = achievements::points_for(&event.achievement_id);
    let reason = format!("Achievement: {}", event.achievement_id);
    ledger
        .apply_points_once(
            &event.user_id,
            PointsClaim::AchievementReward(&event.achievement_id),
            points,
            &reason,
        )
        .await
}

/// Reward every unlock whose points were never credited. Returns the number
/// of rewards applied.
pub async fn reward_pending(db: &SharedDatabase, ledger: &Ledger) -> Result<usize> {
    let pending = db.lock().await.unrewarded_achievements()?;

    let mut rewarded = 0;
    for unlock in pending {
        let event = AchievementUnlocked {
            user_id: unlock.user_id,
            achievement_id: unlock.achievement_id,
        };
        match reward_unlock(ledger, &event).await? {
            PointsOutcome::Applied { .. } => rewarded += 1,
            outcome => debug!(user = %event.user_id, achievement = %event.achievement_id, ?outcome, "pending reward skipped"),
        }
    }
    if rewarded > 0 {
        info!(rewarded, "pending achievement rewards applied");
    }
    Ok(rewarded)
}

/// Drain pending rewards, then consume unlock events until every sender is
/// dropped.
pub fn spawn_unlock_rewards(
    db: SharedDatabase,
    ledger: Ledger,
    mut events: mpsc::UnboundedReceiver<AchievementUnlocked>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = reward_pending(&db, &ledger).await {
            error!(error = %e, "failed to apply pending achievement rewards");
        }

        while let Some(event) = events.recv().await {
            if let Err(e) = reward_unlock(&ledger, &event).await {
                error!(
                    user = %event.user_id,
                    achievement = %event.achievement_id,
                    error = %e,
                    "failed to award achievement points"
                );
            }
        }
        debug!("unlock reward channel closed");
    })
}
