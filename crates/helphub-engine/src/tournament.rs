//! Monthly tournament seasons.
//!
//! Formation shuffles every volunteer into fixed-size groups at the start of
//! a month. Settlement ranks each group by season points on the last day of
//! the month and awards medals to the top of each group.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use helphub_shared::constants::{DEFAULT_GROUP_SIZE, DEFAULT_MEDAL_CUTOFF};
use helphub_shared::{MedalTier, NotificationCategory, Payload, Role, SeasonId};
use helphub_store::{Medal, TournamentGroup};

use crate::assets::MedalIconResolver;
use crate::dispatcher::{Dispatcher, Notification};
use crate::error::Result;
use crate::SharedDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentSettings {
    /// Target group size.
    pub group_size: usize,
    /// Ranked places per group that receive a medal.
    pub medal_cutoff: usize,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            medal_cutoff: DEFAULT_MEDAL_CUTOFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormationSummary {
    pub season: SeasonId,
    pub groups: usize,
    pub participants: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    pub season: SeasonId,
    pub groups: usize,
    pub medals_awarded: usize,
}

/// Split `members` into contiguous chunks of `size`.
///
/// A trailing chunk of at most half the target size is appended to the one
/// before it, so that chunk may end up larger than `size`.
pub fn partition_into_groups<T>(members: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut groups: Vec<Vec<T>> = Vec::with_capacity(members.len() / size + 1);

    let mut iter = members.into_iter().peekable();
    while iter.peek().is_some() {
        groups.push(iter.by_ref().take(size).collect());
    }

    if groups.len() > 1 && groups.last().map_or(false, |g| g.len() <= size / 2) {
        if let Some(tail) = groups.pop() {
            if let Some(prev) = groups.last_mut() {
                prev.extend(tail);
            }
        }
    }
    groups
}

/// True when `date` is the last day of its month.
pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

#[derive(Clone)]
pub struct TournamentManager {
    db: SharedDatabase,
    dispatcher: Dispatcher,
    icons: Arc<dyn MedalIconResolver>,
    settings: TournamentSettings,
}

impl TournamentManager {
    pub fn new(
        db: SharedDatabase,
        dispatcher: Dispatcher,
        icons: Arc<dyn MedalIconResolver>,
        settings: TournamentSettings,
    ) -> Self {
        Self {
            db,
            dispatcher,
            icons,
            settings,
        }
    }

    pub fn settings(&self) -> TournamentSettings {
        self.settings
    }

    /// Form the groups of the season containing `today`.
    pub async fn form_groups(&self, today: NaiveDate) -> Result<FormationSummary> {
        let mut rng = StdRng::from_entropy();
        self.form_groups_with(today, &mut rng).await
    }

    pub async fn form_groups_with<R>(&self, today: NaiveDate, rng: &mut R) -> Result<FormationSummary>
    where
        R: Rng + Send,
    {
        let season = SeasonId::from_date(today);
        let mut ids: Vec<String> = self
            .db
            .lock()
            .await
            .list_users_by_role(Role::Volunteer)?
            .into_iter()
            .map(|u| u.id)
            .collect();
        let participants = ids.len();

        if ids.is_empty() {
            info!(season = %season, "no eligible users, skipping group formation");
            return Ok(FormationSummary {
                season,
                groups: 0,
                participants: 0,
            });
        }

        ids.shuffle(rng);
        let groups = partition_into_groups(ids.clone(), self.settings.group_size);
        let group_count = groups.len();

        for (index, user_ids) in groups.into_iter().enumerate() {
            let number = index as u32 + 1;
            let group = TournamentGroup {
                season_id: season.clone(),
                group_id: TournamentGroup::group_id_for(number),
                group_number: number,
                user_ids,
                created_at: Utc::now(),
            };
            self.db.lock().await.save_group(&group)?;
            debug!(season = %season, group = number, members = group.user_ids.len(), "group saved");
        }

        info!(season = %season, groups = group_count, participants, "tournament groups formed");

        let notification = Notification::new(
            NotificationCategory::TournamentSeasonStart,
            "A new tournament season has started!",
            format!(
                "You have been placed in one of {group_count} groups. Earn points this month to win a medal!"
            ),
        )
        .with_payload(
            Payload::new()
                .with("seasonId", &season)
                .with("groupCount", group_count),
        );
        if let Err(e) = self.dispatcher.dispatch(&ids, &notification).await {
            warn!(season = %season, error = %e, "season start notification failed");
        }

        Ok(FormationSummary {
            season,
            groups: group_count,
            participants,
        })
    }

    /// Award the medals of the season containing `today`.
    ///
    /// Does nothing unless `today` is the last day of its month.
    pub async fn settle_season(&self, today: NaiveDate) -> Result<Option<SettlementSummary>> {
        if !is_last_day_of_month(today) {
            debug!(%today, "not the last day of the month, skipping settlement");
            return Ok(None);
        }

        let season = SeasonId::from_date(today);
        let groups = self.db.lock().await.list_groups(&season)?;
        let mut medals_awarded = 0;

        for group in &groups {
            let mut members = self
                .db
                .lock()
                .await
                .list_group_members(&season, &group.group_id)?;
            if members.is_empty() {
                continue;
            }
            let total = members.len();

            // Members arrive ordered by id; the stable sort keeps that order for ties.
            members.sort_by(|a, b| b.season_points.cmp(&a.season_points));

            let mut medals = Vec::new();
            for (rank, member) in members.iter().take(self.settings.medal_cutoff).enumerate() {
                let place = rank + 1;
                let tier = MedalTier::for_place(place);
                medals.push(Medal {
                    id: format!("{}_{}_{}", season, group.group_id, place),
                    user_id: member.id.clone(),
                    season_id: season.clone(),
                    tier,
                    place: place as u32,
                    icon_path: self.icons.resolve(&season, tier).await,
                    awarded_at: Utc::now(),
                    group_number: group.group_number,
                    total_participants: total as u32,
                    season_points: member.season_points,
                });
            }

            let inserted = self.db.lock().await.award_medals(&medals)?;
            medals_awarded += inserted;
            info!(season = %season, group = group.group_number, medals = inserted, "group settled");

            if inserted > 0 {
                self.notify_winners(&medals).await;
            }
        }

        Ok(Some(SettlementSummary {
            season,
            groups: groups.len(),
            medals_awarded,
        }))
    }

    async fn notify_winners(&self, medals: &[Medal]) {
        let sends = medals.iter().map(|medal| async move {
            let notification = Notification::new(
                NotificationCategory::TournamentMedal,
                "Tournament results!",
                format!(
                    "Congratulations! You took place {} in your group and earned a {} medal.",
                    medal.place, medal.tier
                ),
            )
            .with_payload(
                Payload::new()
                    .with("seasonId", &medal.season_id)
                    .with("place", medal.place)
                    .with("medalType", medal.tier)
                    .with("groupNumber", medal.group_number),
            );
            (medal, self.dispatcher.notify_user(&medal.user_id, &notification).await)
        });

        for (medal, result) in join_all(sends).await {
            if let Err(e) = result {
                warn!(user = %medal.user_id, medal = %medal.id, error = %e, "medal notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, harness_with, seed_user};
    use helphub_store::User;

    fn sizes(groups: &[Vec<u32>]) -> Vec<usize> {
        groups.iter().map(Vec::len).collect()
    }

    #[test]
    fn partition_merges_small_tail() {
        let groups = partition_into_groups((0..250).collect(), 100);
        assert_eq!(sizes(&groups), vec![100, 150]);

        let groups = partition_into_groups((0..251).collect(), 100);
        assert_eq!(sizes(&groups), vec![100, 100, 51]);

        let groups = partition_into_groups((0..12).collect(), 5);
        assert_eq!(sizes(&groups), vec![5, 7]);

        let groups = partition_into_groups((0..13).collect(), 5);
        assert_eq!(sizes(&groups), vec![5, 5, 3]);
    }

    #[test]
    fn partition_keeps_everyone_exactly_once() {
        for n in 0..60u32 {
            for g in 1..12usize {
                let groups = partition_into_groups((0..n).collect(), g);
                let mut all: Vec<u32> = groups.iter().flatten().copied().collect();
                all.sort_unstable();
                assert_eq!(all, (0..n).collect::<Vec<_>>());

                let ceil = (n as usize + g - 1) / g;
                assert!(groups.len() == ceil || groups.len() + 1 == ceil, "n={n} g={g}");

                let half = (g + 1) / 2;
                if (n as usize) >= half {
                    assert!(groups.iter().all(|grp| grp.len() >= half), "n={n} g={g}");
                }
            }
        }
    }

    #[test]
    fn last_day_detection() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert!(is_last_day_of_month(d(2026, 10, 31)));
        assert!(!is_last_day_of_month(d(2026, 10, 30)));
        assert!(is_last_day_of_month(d(2028, 2, 29)));
        assert!(!is_last_day_of_month(d(2026, 2, 27)));
        assert!(is_last_day_of_month(d(2026, 12, 31)));
    }

    #[tokio::test]
    async fn formation_assigns_everyone_and_resets_season_points() {
        let h = harness_with(TournamentSettings {
            group_size: 4,
            medal_cutoff: 3,
        });
        for i in 0..10 {
            let mut user = User::new(format!("v{i:02}"), Role::Volunteer);
            user.season_points = 40;
            h.db.lock().await.upsert_user(&user).unwrap();
        }
        seed_user(&h.db, "org", Role::Organization, None).await;

        let today = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let summary = h
            .engine
            .tournament()
            .form_groups_with(today, &mut rng)
            .await
            .unwrap();
        // 4 + 4 + 2 with the short tail merged.
        assert_eq!(summary.groups, 2);
        assert_eq!(summary.participants, 10);

        let db = h.db.lock().await;
        let season: SeasonId = "2026-11".parse().unwrap();
        let groups = db.list_groups(&season).unwrap();
        assert_eq!(groups.iter().map(|g| g.user_ids.len()).sum::<usize>(), 10);
        assert_eq!(groups[0].group_id, "group_1");

        for user in db.list_users_by_role(Role::Volunteer).unwrap() {
            assert_eq!(user.current_season_id.as_deref(), Some("2026-11"));
            assert!(user.current_group_id.is_some());
            assert_eq!(user.season_points, 0);
        }
        assert!(db.get_user("org").unwrap().current_group_id.is_none());

        let inbox = db.list_notifications("v00", 10).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].data.get("groupCount"), Some("2"));
        assert!(db.list_notifications("org", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn settlement_ranks_with_ties_by_id() {
        let h = harness_with(TournamentSettings {
            group_size: 4,
            medal_cutoff: 10,
        });
        let season: SeasonId = "2026-10".parse().unwrap();
        for (id, points) in [("u1", 50), ("u2", 50), ("u3", 30), ("u4", 10)] {
            let mut user = User::new(id, Role::Volunteer);
            user.season_points = points;
            user.current_group_id = Some("group_1".into());
            user.current_season_id = Some(season.to_string());
            h.db.lock().await.upsert_user(&user).unwrap();
        }
        h.db.lock()
            .await
            .conn()
            .execute(
                "INSERT INTO tournament_groups (season_id, group_id, group_number, user_ids, created_at)
                 VALUES ('2026-10', 'group_1', 1, '[]', '2026-10-01T02:00:00.000Z')",
                [],
            )
            .unwrap();

        let manager = h.engine.tournament();
        let early = NaiveDate::from_ymd_opt(2026, 10, 30).unwrap();
        assert!(manager.settle_season(early).await.unwrap().is_none());

        let last = NaiveDate::from_ymd_opt(2026, 10, 31).unwrap();
        let summary = manager.settle_season(last).await.unwrap().unwrap();
        assert_eq!(summary.medals_awarded, 4);

        let db = h.db.lock().await;
        let tier_of = |id: &str| db.list_medals(id).unwrap()[0].tier;
        assert_eq!(tier_of("u1"), MedalTier::Gold);
        assert_eq!(tier_of("u2"), MedalTier::Silver);
        assert_eq!(tier_of("u3"), MedalTier::Bronze);
        assert_eq!(tier_of("u4"), MedalTier::Bronze);

        let medals = db.list_medals("u1").unwrap();
        let gold = &medals[0];
        assert_eq!(gold.id, "2026-10_group_1_1");
        assert_eq!(gold.total_participants, 4);
        assert_eq!(gold.season_points, 50);
        assert_eq!(gold.icon_path, None);

        let inbox = db.list_notifications("u2", 10).unwrap();
        assert_eq!(inbox[0].category, NotificationCategory::TournamentMedal);
        assert_eq!(inbox[0].data.get("medalType"), Some("silver"));
        assert_eq!(inbox[0].data.get("place"), Some("2"));
        drop(db);

        let rerun = manager.settle_season(last).await.unwrap().unwrap();
        assert_eq!(rerun.medals_awarded, 0);
        assert_eq!(h.db.lock().await.list_medals("u1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cutoff_limits_medals() {
        let h = harness_with(TournamentSettings {
            group_size: 100,
            medal_cutoff: 2,
        });
        for i in 0..5 {
            seed_user(&h.db, &format!("v{i}"), Role::Volunteer, None).await;
        }
        let manager = h.engine.tournament();
        let first = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        manager
            .form_groups_with(first, &mut StdRng::seed_from_u64(1))
            .await
            .unwrap();

        let last = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let summary = manager.settle_season(last).await.unwrap().unwrap();
        assert_eq!(summary.groups, 1);
        assert_eq!(summary.medals_awarded, 2);
    }

    #[tokio::test]
    async fn formation_without_volunteers_is_a_noop() {
        let h = harness();
        let summary = h
            .engine
            .tournament()
            .form_groups(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(summary.groups, 0);
    }
}
