//! Points ledger.

use serde::Serialize;
use tracing::{debug, warn};

use helphub_shared::{level_for, level_info, NotificationCategory, Payload};
use helphub_store::{LevelChange, PointsClaim, PointsUpdate, User};

use crate::dispatcher::{Dispatcher, Notification};
use crate::error::Result;
use crate::SharedDatabase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PointsOutcome {
    Applied {
        total: i64,
        season_total: i64,
        level: u8,
        leveled_up: bool,
    },
    Ineligible,
    UserNotFound,
    /// The one-shot claim behind this delta was already taken.
    AlreadyClaimed,
}

#[derive(Clone)]
pub struct Ledger {
    db: SharedDatabase,
    dispatcher: Dispatcher,
}

impl Ledger {
    pub fn new(db: SharedDatabase, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Apply a signed delta to a volunteer's cumulative and season totals.
    ///
    /// The level is recomputed from the new total and only ever raised. A
    /// points-history row is appended on a best-effort basis.
    pub async fn apply_points(&self, user_id: &str, delta: i64, reason: &str) -> Result<PointsOutcome> {
        self.apply(user_id, delta, reason, None).await
    }

    /// Like [`Ledger::apply_points`], with `claim` committed in the same
    /// transaction as the totals. A second call with the same claim is
    /// [`PointsOutcome::AlreadyClaimed`].
    pub async fn apply_points_once(
        &self,
        user_id: &str,
        claim: PointsClaim<'_>,
        delta: i64,
        reason: &str,
    ) -> Result<PointsOutcome> {
        self.apply(user_id, delta, reason, Some(claim)).await
    }

    async fn apply(
        &self,
        user_id: &str,
        delta: i64,
        reason: &str,
        claim: Option<PointsClaim<'_>>,
    ) -> Result<PointsOutcome> {
        let mut ineligible = false;
        let mut accepted = false;

        let applied = {
            let mut db = self.db.lock().await;
            let decide = |user: &User| {
                if !user.role.is_point_eligible() {
                    ineligible = true;
                    return None;
                }
                accepted = true;

                let points = user.points + delta;
                let level = level_for(points);
                let level_up = (level > user.current_level).then(|| LevelChange {
                    level,
                    frame_path: level_info(level).frame_path.to_string(),
                });
                Some(PointsUpdate {
                    points,
                    season_points: user.season_points + delta,
                    level_up,
                })
            };
            let applied = match claim {
                Some(claim) => db.update_points_once(user_id, claim, decide)?,
                None => db.update_points_with(user_id, decide)?,
            };

            if let Some((_, ref update)) = applied {
                if let Err(e) = db.insert_points_transaction(user_id, delta, reason, update.points) {
                    warn!(user = %user_id, error = %e, "failed to append points history");
                }
            }
            applied
        };

        let Some((before, update)) = applied else {
            return Ok(if ineligible {
                PointsOutcome::Ineligible
            } else if accepted {
                PointsOutcome::AlreadyClaimed
            } else {
                PointsOutcome::UserNotFound
            });
        };

        debug!(user = %user_id, delta, total = update.points, %reason, "points applied");

        let level = match update.level_up {
            Some(ref change) => {
                self.announce_level(user_id, change.level).await;
                change.level
            }
            None => before.current_level,
        };

        Ok(PointsOutcome::Applied {
            total: update.points,
            season_total: update.season_points,
            level,
            leveled_up: update.level_up.is_some(),
        })
    }

    async fn announce_level(&self, user_id: &str, level: u8) {
        let info = level_info(level);
        let notification = Notification::new(
            NotificationCategory::LevelUp,
            "New level!",
            format!("Congratulations! You reached level {}: {}", info.level, info.title),
        )
        .with_payload(
            Payload::new()
                .with("level", info.level)
                .with("levelTitle", info.title)
                .with("levelDescription", info.description),
        );

        if let Err(e) = self.dispatcher.notify_user(user_id, &notification).await {
            warn!(user = %user_id, level, error = %e, "level-up notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, seed_user};
    use helphub_shared::Role;

    #[tokio::test]
    async fn crossing_a_boundary_levels_up_and_notifies() {
        let h = harness();
        let mut user = User::new("u", Role::Volunteer);
        user.points = 95;
        user.current_level = 4;
        user.push_token = Some("tok-u".into());
        h.db.lock().await.upsert_user(&user).unwrap();

        let outcome = h.engine.ledger().apply_points("u", 10, "event").await.unwrap();
        assert_eq!(
            outcome,
            PointsOutcome::Applied {
                total: 105,
                season_total: 10,
                level: 5,
                leveled_up: true,
            }
        );

        let db = h.db.lock().await;
        let stored = db.get_user("u").unwrap();
        assert_eq!(stored.current_level, 5);
        assert_eq!(stored.frame_path.as_deref(), Some(level_info(5).frame_path));

        let history = db.list_points_history("u").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, 10);
        assert_eq!(history[0].total_points, 105);

        let inbox = db.list_notifications("u", 10).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].category, NotificationCategory::LevelUp);
        assert_eq!(inbox[0].data.get("levelTitle"), Some("Inspiring Llama"));
        assert_eq!(h.transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn totals_are_the_sum_of_deltas() {
        let h = harness();
        seed_user(&h.db, "u", Role::Volunteer, None).await;

        let ledger = h.engine.ledger();
        for delta in [3, 2, 4] {
            ledger.apply_points("u", delta, "test").await.unwrap();
        }
        let outcome = ledger.apply_points("u", 0, "test").await.unwrap();
        assert!(matches!(
            outcome,
            PointsOutcome::Applied { total: 9, level: 1, leveled_up: false, .. }
        ));

        ledger.apply_points("u", 1, "test").await.unwrap();
        let db = h.db.lock().await;
        let user = db.get_user("u").unwrap();
        assert_eq!(user.points, 10);
        assert_eq!(user.current_level, 2);
        assert_eq!(db.list_points_history("u").unwrap().len(), 5);
    }

    #[tokio::test]
    async fn only_volunteers_accrue_points() {
        let h = harness();
        seed_user(&h.db, "org", Role::Organization, None).await;

        let ledger = h.engine.ledger();
        assert_eq!(
            ledger.apply_points("org", 20, "Event organized").await.unwrap(),
            PointsOutcome::Ineligible
        );
        assert_eq!(
            ledger.apply_points("ghost", 20, "x").await.unwrap(),
            PointsOutcome::UserNotFound
        );
        assert_eq!(h.db.lock().await.get_user("org").unwrap().points, 0);
    }

    #[tokio::test]
    async fn level_never_drops() {
        let h = harness();
        let mut user = User::new("u", Role::Volunteer);
        user.points = 35;
        user.current_level = 3;
        h.db.lock().await.upsert_user(&user).unwrap();

        let outcome = h.engine.ledger().apply_points("u", -20, "correction").await.unwrap();
        assert!(matches!(
            outcome,
            PointsOutcome::Applied { total: 15, level: 3, leveled_up: false, .. }
        ));
        assert_eq!(h.db.lock().await.get_user("u").unwrap().current_level, 3);
    }

    #[tokio::test]
    async fn a_claim_credits_once() {
        let h = harness();
        seed_user(&h.db, "u", Role::Volunteer, None).await;

        let ledger = h.engine.ledger();
        let claim = PointsClaim::ProcessedEvent("e1");
        assert!(matches!(
            ledger.apply_points_once("u", claim, 10, "Event participation").await.unwrap(),
            PointsOutcome::Applied { total: 10, .. }
        ));
        assert_eq!(
            ledger.apply_points_once("u", claim, 10, "Event participation").await.unwrap(),
            PointsOutcome::AlreadyClaimed
        );

        let db = h.db.lock().await;
        assert_eq!(db.get_user("u").unwrap().points, 10);
        assert_eq!(db.list_points_history("u").unwrap().len(), 1);
    }
}
