//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use helphub_shared::{MedalTier, NotificationCategory, Payload, Role, SeasonId, TaskStatus};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A platform account, limited to the fields the engine reads or writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Document id assigned by the platform.
    pub id: String,
    pub role: Role,
    pub display_name: Option<String>,
    /// Cumulative points.
    pub points: i64,
    /// Points earned in the current tournament period.
    pub season_points: i64,
    /// Cached level derived from `points`.
    pub current_level: u8,
    /// Cosmetic frame of the current level.
    pub frame_path: Option<String>,
    pub current_group_id: Option<String>,
    pub current_season_id: Option<String>,
    /// Category wire name -> enabled. Missing categories are enabled.
    pub notification_settings: BTreeMap<String, bool>,
    /// Push-delivery address; `None` suppresses push but not the record.
    pub push_token: Option<String>,
    pub achievements_count: u32,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A fresh account with zero points at level 1.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: None,
            points: 0,
            season_points: 0,
            current_level: 1,
            frame_path: None,
            current_group_id: None,
            current_season_id: None,
            notification_settings: BTreeMap::new(),
            push_token: None,
            achievements_count: 0,
            created_at: Utc::now(),
        }
    }

    /// A category is enabled unless explicitly switched off.
    pub fn category_enabled(&self, category: NotificationCategory) -> bool {
        self.notification_settings
            .get(category.as_str())
            .copied()
            .unwrap_or(true)
    }
}

/// Result of a ledger decision, written back in one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsUpdate {
    pub points: i64,
    pub season_points: i64,
    /// Present only when the level increased.
    pub level_up: Option<LevelChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChange {
    pub level: u8,
    pub frame_path: String,
}

/// A one-shot marker committed together with a points update.
///
/// If the marker is already claimed the update is not written; if the
/// update fails the marker is rolled back with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsClaim<'a> {
    /// Participation credit for one completed event.
    ProcessedEvent(&'a str),
    /// Points reward of one unlocked achievement.
    AchievementReward(&'a str),
}

// ---------------------------------------------------------------------------
// Notification record
// ---------------------------------------------------------------------------

/// One in-app notification for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub data: Payload,
    pub is_read: bool,
    /// Assigned by the store at insert time.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Points transaction
// ---------------------------------------------------------------------------

/// Immutable log entry of one points delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointsTransaction {
    pub id: Uuid,
    pub user_id: String,
    pub amount: i64,
    pub reason: String,
    /// Cumulative total after this delta.
    pub total_points: i64,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Achievement unlock / processed event marker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AchievementUnlock {
    pub user_id: String,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
    /// Acknowledgement flag owned by the client presentation layer.
    pub dialog_shown: bool,
    /// Set in the same transaction that credits the reward points.
    pub rewarded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessedEvent {
    pub user_id: String,
    pub event_id: String,
    pub processed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tournament
// ---------------------------------------------------------------------------

/// A fixed-membership subset of volunteers competing in one season.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentGroup {
    pub season_id: SeasonId,
    /// `group_<number>`
    pub group_id: String,
    /// 1-based ordinal.
    pub group_number: u32,
    /// Members at formation time.
    pub user_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl TournamentGroup {
    pub fn group_id_for(number: u32) -> String {
        format!("group_{number}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medal {
    /// `<season>_<group>_<place>`
    pub id: String,
    pub user_id: String,
    pub season_id: SeasonId,
    pub tier: MedalTier,
    /// Rank inside the group, 1-based.
    pub place: u32,
    pub icon_path: Option<String>,
    pub awarded_at: DateTime<Utc>,
    pub group_number: u32,
    /// Group size at settlement.
    pub total_participants: u32,
    /// The winner's season points at award time.
    pub season_points: i64,
}

// ---------------------------------------------------------------------------
// Calendar event
// ---------------------------------------------------------------------------

/// The part of a platform event read by the daily sweeps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub name: String,
    pub organizer_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub participant_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Project task
// ---------------------------------------------------------------------------

/// The part of a project task read by the deadline sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectTask {
    pub project_id: String,
    pub project_title: String,
    pub organizer_id: Option<String>,
    pub task_id: String,
    pub task_title: String,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_volunteer_ids: Vec<String>,
}
