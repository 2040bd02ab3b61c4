use helphub_shared::SeasonId;
use rusqlite::params;

use crate::database::{format_timestamp, parse_enum, parse_json, parse_timestamp, Database};
use crate::error::Result;
use crate::models::{Medal, TournamentGroup};

impl Database {
    /// Persist a group and point each member at it, resetting their season
    /// points. One transaction per group.
    pub fn save_group(&mut self, group: &TournamentGroup) -> Result<()> {
        let user_ids = serde_json::to_string(&group.user_ids)?;
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO tournament_groups
                 (season_id, group_id, group_number, user_ids, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                group.season_id.as_str(),
                group.group_id,
                group.group_number,
                user_ids,
                format_timestamp(&group.created_at),
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "UPDATE users
                 SET current_group_id = ?2, current_season_id = ?3, season_points = 0
                 WHERE id = ?1",
            )?;
            for user_id in &group.user_ids {
                stmt.execute(params![user_id, group.group_id, group.season_id.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Groups of a season ordered by group number.
    pub fn list_groups(&self, season: &SeasonId) -> Result<Vec<TournamentGroup>> {
        let mut stmt = self.conn().prepare(
            "SELECT season_id, group_id, group_number, user_ids, created_at
             FROM tournament_groups
             WHERE season_id = ?1
             ORDER BY group_number",
        )?;
        let rows = stmt.query_map(params![season.as_str()], |row| {
            let season_id: String = row.get(0)?;
            let user_ids: String = row.get(3)?;
            let created_at: String = row.get(4)?;
            Ok(TournamentGroup {
                season_id: parse_enum(0, &season_id)?,
                group_id: row.get(1)?,
                group_number: row.get(2)?,
                user_ids: parse_json(3, &user_ids)?,
                created_at: parse_timestamp(4, &created_at)?,
            })
        })?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }

    /// Write a group's medals in one transaction. Medals whose id already
    /// exists are skipped; returns the number of new rows.
    pub fn award_medals(&mut self, medals: &[Medal]) -> Result<usize> {
        let tx = self.conn_mut().transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO medals
                     (id, user_id, season_id, tier, place, icon_path, awarded_at,
                      group_number, total_participants, season_points)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for medal in medals {
                inserted += stmt.execute(params![
                    medal.id,
                    medal.user_id,
                    medal.season_id.as_str(),
                    medal.tier.as_str(),
                    medal.place,
                    medal.icon_path,
                    format_timestamp(&medal.awarded_at),
                    medal.group_number,
                    medal.total_participants,
                    medal.season_points,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// A user's medals, newest first.
    pub fn list_medals(&self, user_id: &str) -> Result<Vec<Medal>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, season_id, tier, place, icon_path, awarded_at,
                    group_number, total_participants, season_points
             FROM medals
             WHERE user_id = ?1
             ORDER BY awarded_at DESC, id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let season_id: String = row.get(2)?;
            let tier: String = row.get(3)?;
            let awarded_at: String = row.get(6)?;
            Ok(Medal {
                id: row.get(0)?,
                user_id: row.get(1)?,
                season_id: parse_enum(2, &season_id)?,
                tier: parse_enum(3, &tier)?,
                place: row.get(4)?,
                icon_path: row.get(5)?,
                awarded_at: parse_timestamp(6, &awarded_at)?,
                group_number: row.get(7)?,
                total_participants: row.get(8)?,
                season_points: row.get(9)?,
            })
        })?;

        let mut medals = Vec::new();
        for row in rows {
            medals.push(row?);
        }
        Ok(medals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::Utc;
    use helphub_shared::{MedalTier, Role};

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn season() -> SeasonId {
        "2026-10".parse().unwrap()
    }

    #[test]
    fn save_group_moves_members() {
        let (_dir, mut db) = open_test_db();
        for id in ["a", "b"] {
            let mut user = User::new(id, Role::Volunteer);
            user.season_points = 77;
            db.upsert_user(&user).unwrap();
        }

        let group = TournamentGroup {
            season_id: season(),
            group_id: TournamentGroup::group_id_for(1),
            group_number: 1,
            user_ids: vec!["a".into(), "b".into()],
            created_at: Utc::now(),
        };
        db.save_group(&group).unwrap();

        let a = db.get_user("a").unwrap();
        assert_eq!(a.current_group_id.as_deref(), Some("group_1"));
        assert_eq!(a.current_season_id.as_deref(), Some("2026-10"));
        assert_eq!(a.season_points, 0);

        let groups = db.list_groups(&season()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].user_ids, vec!["a", "b"]);
        assert_eq!(db.list_group_members(&season(), "group_1").unwrap().len(), 2);
    }

    #[test]
    fn medals_are_not_duplicated() {
        let (_dir, mut db) = open_test_db();
        db.upsert_user(&User::new("a", Role::Volunteer)).unwrap();

        let medal = Medal {
            id: "2026-10_group_1_1".into(),
            user_id: "a".into(),
            season_id: season(),
            tier: MedalTier::Gold,
            place: 1,
            icon_path: None,
            awarded_at: Utc::now(),
            group_number: 1,
            total_participants: 1,
            season_points: 50,
        };
        assert_eq!(db.award_medals(&[medal.clone()]).unwrap(), 1);
        assert_eq!(db.award_medals(&[medal]).unwrap(), 0);

        let medals = db.list_medals("a").unwrap();
        assert_eq!(medals.len(), 1);
        assert_eq!(medals[0].tier, MedalTier::Gold);
        assert_eq!(medals[0].season_points, 50);
    }
}
