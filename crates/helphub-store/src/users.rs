use std::collections::BTreeMap;

use chrono::Utc;
use helphub_shared::{NotificationCategory, Role, SeasonId};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::database::{format_timestamp, not_found, parse_enum, parse_json, parse_timestamp, Database};
use crate::error::Result;
use crate::models::{PointsClaim, PointsUpdate, User};

const USER_COLUMNS: &str = "id, role, display_name, points, season_points, current_level,
     frame_path, current_group_id, current_season_id, notification_settings,
     push_token, achievements_count, created_at";

impl Database {
    /// Insert a user, or overwrite every field of an existing one.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        let settings = serde_json::to_string(&user.notification_settings)?;
        self.conn().execute(
            "INSERT INTO users (id, role, display_name, points, season_points, current_level,
                 frame_path, current_group_id, current_season_id, notification_settings,
                 push_token, achievements_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                 role = excluded.role,
                 display_name = excluded.display_name,
                 points = excluded.points,
                 season_points = excluded.season_points,
                 current_level = excluded.current_level,
                 frame_path = excluded.frame_path,
                 current_group_id = excluded.current_group_id,
                 current_season_id = excluded.current_season_id,
                 notification_settings = excluded.notification_settings,
                 push_token = excluded.push_token,
                 achievements_count = excluded.achievements_count",
            params![
                user.id,
                user.role.as_str(),
                user.display_name,
                user.points,
                user.season_points,
                user.current_level,
                user.frame_path,
                user.current_group_id,
                user.current_season_id,
                settings,
                user.push_token,
                user.achievements_count,
                format_timestamp(&user.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Like [`Database::get_user`] but absent users are `None`.
    pub fn find_user(&self, id: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// All users holding `role`, ordered by id.
    pub fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![role.as_str()], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Users whose group pointer is `(season, group_id)`, ordered by id.
    pub fn list_group_members(&self, season: &SeasonId, group_id: &str) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE current_season_id = ?1 AND current_group_id = ?2
             ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![season.as_str(), group_id], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Returns `false` when the user does not exist.
    pub fn set_notification_preference(
        &mut self,
        user_id: &str,
        category: NotificationCategory,
        enabled: bool,
    ) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;
        let current: Option<String> = tx
            .query_row(
                "SELECT notification_settings FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Ok(false);
        };

        let mut settings: BTreeMap<String, bool> = serde_json::from_str(&current)?;
        settings.insert(category.as_str().to_string(), enabled);
        tx.execute(
            "UPDATE users SET notification_settings = ?2 WHERE id = ?1",
            params![user_id, serde_json::to_string(&settings)?],
        )?;
        tx.commit()?;
        Ok(true)
    }

    pub fn set_achievements_count(&self, user_id: &str, count: u32) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET achievements_count = ?2 WHERE id = ?1",
            params![user_id, count],
        )?;
        Ok(affected > 0)
    }

    /// Read a user, let `decide` compute the new totals and write them back,
    /// all inside one IMMEDIATE transaction.
    ///
    /// Returns `None` when the user is absent or `decide` declines. The
    /// returned user is the state *before* the update.
    pub fn update_points_with<F>(
        &mut self,
        user_id: &str,
        decide: F,
    ) -> Result<Option<(User, PointsUpdate)>>
    where
        F: FnOnce(&User) -> Option<PointsUpdate>,
    {
        self.write_points(user_id, None, decide)
    }

    /// Like [`Database::update_points_with`], but `claim` is recorded in the
    /// same transaction as the new totals.
    ///
    /// Returns `None` without writing anything when the claim was already
    /// taken. A failed points write leaves the claim untaken.
    pub fn update_points_once<F>(
        &mut self,
        user_id: &str,
        claim: PointsClaim<'_>,
        decide: F,
    ) -> Result<Option<(User, PointsUpdate)>>
    where
        F: FnOnce(&User) -> Option<PointsUpdate>,
    {
        self.write_points(user_id, Some(claim), decide)
    }

    fn write_points<F>(
        &mut self,
        user_id: &str,
        claim: Option<PointsClaim<'_>>,
        decide: F,
    ) -> Result<Option<(User, PointsUpdate)>>
    where
        F: FnOnce(&User) -> Option<PointsUpdate>,
    {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user = tx
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![user_id],
                row_to_user,
            )
            .optional()?;
        let Some(user) = user else {
            return Ok(None);
        };
        let Some(update) = decide(&user) else {
            return Ok(None);
        };

        let claimed = match claim {
            None => true,
            Some(PointsClaim::ProcessedEvent(event_id)) => {
                tx.execute(
                    "INSERT OR IGNORE INTO processed_events (user_id, event_id, processed_at)
                     VALUES (?1, ?2, ?3)",
                    params![user_id, event_id, format_timestamp(&Utc::now())],
                )? > 0
            }
            Some(PointsClaim::AchievementReward(achievement_id)) => {
                tx.execute(
                    "UPDATE achievements SET rewarded = 1
                     WHERE user_id = ?1 AND achievement_id = ?2 AND rewarded = 0",
                    params![user_id, achievement_id],
                )? > 0
            }
        };
        if !claimed {
            // Dropping the transaction rolls it back.
            return Ok(None);
        }

        match &update.level_up {
            Some(change) => {
                tx.execute(
                    "UPDATE users
                     SET points = ?2, season_points = ?3, current_level = ?4, frame_path = ?5
                     WHERE id = ?1",
                    params![
                        user_id,
                        update.points,
                        update.season_points,
                        change.level,
                        change.frame_path,
                    ],
                )?;
            }
            None => {
                tx.execute(
                    "UPDATE users SET points = ?2, season_points = ?3 WHERE id = ?1",
                    params![user_id, update.points, update.season_points],
                )?;
            }
        }
        tx.commit()?;

        Ok(Some((user, update)))
    }
}

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(1)?;
    let settings: String = row.get(9)?;
    let created_at: String = row.get(12)?;

    Ok(User {
        id: row.get(0)?,
        role: parse_enum(1, &role)?,
        display_name: row.get(2)?,
        points: row.get(3)?,
        season_points: row.get(4)?,
        current_level: row.get(5)?,
        frame_path: row.get(6)?,
        current_group_id: row.get(7)?,
        current_season_id: row.get(8)?,
        notification_settings: parse_json(9, &settings)?,
        push_token: row.get(10)?,
        achievements_count: row.get(11)?,
        created_at: parse_timestamp(12, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LevelChange;
    use crate::StoreError;

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn upsert_and_get() {
        let (_dir, db) = open_test_db();
        let mut user = User::new("u1", Role::Volunteer);
        user.display_name = Some("Ada".into());
        user.push_token = Some("tok-1".into());
        db.upsert_user(&user).unwrap();

        let loaded = db.get_user("u1").unwrap();
        assert_eq!(loaded.display_name.as_deref(), Some("Ada"));
        assert_eq!(loaded.role, Role::Volunteer);
        assert_eq!(loaded.current_level, 1);

        user.points = 42;
        db.upsert_user(&user).unwrap();
        assert_eq!(db.get_user("u1").unwrap().points, 42);
    }

    #[test]
    fn missing_user() {
        let (_dir, db) = open_test_db();
        assert!(matches!(db.get_user("nobody"), Err(StoreError::NotFound)));
        assert!(db.find_user("nobody").unwrap().is_none());
    }

    #[test]
    fn preferences_are_merged() {
        let (_dir, mut db) = open_test_db();
        db.upsert_user(&User::new("u1", Role::Volunteer)).unwrap();

        assert!(db
            .set_notification_preference("u1", NotificationCategory::LevelUp, false)
            .unwrap());
        assert!(db
            .set_notification_preference("u1", NotificationCategory::Chat, true)
            .unwrap());
        assert!(!db
            .set_notification_preference("ghost", NotificationCategory::Chat, true)
            .unwrap());

        let user = db.get_user("u1").unwrap();
        assert!(!user.category_enabled(NotificationCategory::LevelUp));
        assert!(user.category_enabled(NotificationCategory::Chat));
        assert_eq!(user.notification_settings.len(), 2);
    }

    #[test]
    fn role_listing_is_ordered() {
        let (_dir, db) = open_test_db();
        for id in ["c", "a", "b"] {
            db.upsert_user(&User::new(id, Role::Volunteer)).unwrap();
        }
        db.upsert_user(&User::new("org", Role::Organization)).unwrap();

        let ids: Vec<String> = db
            .list_users_by_role(Role::Volunteer)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn group_members_filter_by_season_too() {
        let (_dir, db) = open_test_db();
        let mut a = User::new("a", Role::Volunteer);
        a.current_group_id = Some("group_1".into());
        a.current_season_id = Some("2026-10".into());
        let mut b = a.clone();
        b.id = "b".into();
        b.current_season_id = Some("2026-09".into());
        db.upsert_user(&a).unwrap();
        db.upsert_user(&b).unwrap();

        let season: SeasonId = "2026-10".parse().unwrap();
        let members = db.list_group_members(&season, "group_1").unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "a");
    }

    #[test]
    fn update_points_applies_decision() {
        let (_dir, mut db) = open_test_db();
        db.upsert_user(&User::new("u1", Role::Volunteer)).unwrap();

        let (before, update) = db
            .update_points_with("u1", |u| {
                Some(PointsUpdate {
                    points: u.points + 15,
                    season_points: u.season_points + 15,
                    level_up: Some(LevelChange {
                        level: 2,
                        frame_path: "frame_2.png".into(),
                    }),
                })
            })
            .unwrap()
            .unwrap();
        assert_eq!(before.points, 0);
        assert_eq!(update.points, 15);

        let after = db.get_user("u1").unwrap();
        assert_eq!(after.points, 15);
        assert_eq!(after.season_points, 15);
        assert_eq!(after.current_level, 2);
        assert_eq!(after.frame_path.as_deref(), Some("frame_2.png"));
    }

    #[test]
    fn update_points_declined_or_absent() {
        let (_dir, mut db) = open_test_db();
        db.upsert_user(&User::new("u1", Role::Organization)).unwrap();

        assert!(db.update_points_with("u1", |_| None).unwrap().is_none());
        assert!(db
            .update_points_with("ghost", |_| unreachable!())
            .unwrap()
            .is_none());
        assert_eq!(db.get_user("u1").unwrap().points, 0);
    }

    fn add_ten(u: &User) -> Option<PointsUpdate> {
        Some(PointsUpdate {
            points: u.points + 10,
            season_points: u.season_points + 10,
            level_up: None,
        })
    }

    #[test]
    fn event_claim_is_taken_once() {
        let (_dir, mut db) = open_test_db();
        db.upsert_user(&User::new("u1", Role::Volunteer)).unwrap();

        let claim = PointsClaim::ProcessedEvent("e1");
        assert!(db.update_points_once("u1", claim, add_ten).unwrap().is_some());
        assert!(db.update_points_once("u1", claim, add_ten).unwrap().is_none());

        assert_eq!(db.get_user("u1").unwrap().points, 10);
        assert_eq!(db.count_processed_events("u1").unwrap(), 1);
    }

    #[test]
    fn failed_points_write_releases_the_claim() {
        let (_dir, mut db) = open_test_db();
        db.upsert_user(&User::new("u1", Role::Volunteer)).unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER fail_points BEFORE UPDATE OF points ON users
                 BEGIN SELECT RAISE(ABORT, 'points unavailable'); END;",
            )
            .unwrap();

        let claim = PointsClaim::ProcessedEvent("e1");
        assert!(db.update_points_once("u1", claim, add_ten).is_err());
        assert_eq!(db.count_processed_events("u1").unwrap(), 0);

        db.conn().execute_batch("DROP TRIGGER fail_points;").unwrap();
        assert!(db.update_points_once("u1", claim, add_ten).unwrap().is_some());
        assert_eq!(db.get_user("u1").unwrap().points, 10);
        assert_eq!(db.count_processed_events("u1").unwrap(), 1);
    }

    #[test]
    fn reward_claim_needs_an_unrewarded_unlock() {
        let (_dir, mut db) = open_test_db();
        db.upsert_user(&User::new("u1", Role::Volunteer)).unwrap();
        let claim = PointsClaim::AchievementReward("donator");

        // No unlock row yet.
        assert!(db.update_points_once("u1", claim, add_ten).unwrap().is_none());

        db.insert_achievement_unlock("u1", "donator", Utc::now()).unwrap();
        assert!(db.update_points_once("u1", claim, add_ten).unwrap().is_some());
        assert!(db.update_points_once("u1", claim, add_ten).unwrap().is_none());

        assert_eq!(db.get_user("u1").unwrap().points, 10);
        assert!(db.list_achievements("u1").unwrap()[0].rewarded);
    }
}
