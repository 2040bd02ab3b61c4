//! Notification categories and their delivery policy.
//!
//! The category is what users toggle in their notification preferences
//! and what the mobile client receives under the `type` data key. Each
//! category has an entry in [`POLICY_TABLE`] saying whether a delivery is
//! persisted as an in-app record and whether it is pushed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationCategory {
    Chat,
    FundraisingApplication,
    FundraisingApplicationEdit,
    ProjectApplication,
    ProjectApplicationEdit,
    FriendRequest,
    FriendRequestEdit,
    RaffleWinner,
    EventUpdate,
    NewFundraising,
    FundraisingCompleted,
    FundraisingDonation,
    AdminNotification,
    EventReminder,
    ProjectDeadline,
    SupportReply,
    Achievement,
    TaskCompleted,
    TaskConfirmed,
    ReportCreated,
    LevelUp,
    TournamentSeasonStart,
    TournamentMedal,
}

/// How deliveries of one category are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPolicy {
    /// Write an in-app notification record.
    pub persist: bool,
    /// Send a push message when the recipient has a push address.
    pub push: bool,
}

const STORED: CategoryPolicy = CategoryPolicy {
    persist: true,
    push: true,
};

// High-volume, short-lived categories are pushed but not stored.
const PUSH_ONLY: CategoryPolicy = CategoryPolicy {
    persist: false,
    push: true,
};

/// Delivery policy for every category.
pub const POLICY_TABLE: &[(NotificationCategory, CategoryPolicy)] = &[
    (NotificationCategory::Chat, PUSH_ONLY),
    (NotificationCategory::FundraisingApplication, STORED),
    (NotificationCategory::FundraisingApplicationEdit, STORED),
    (NotificationCategory::ProjectApplication, STORED),
    (NotificationCategory::ProjectApplicationEdit, STORED),
    (NotificationCategory::FriendRequest, STORED),
    (NotificationCategory::FriendRequestEdit, STORED),
    (NotificationCategory::RaffleWinner, STORED),
    (NotificationCategory::EventUpdate, STORED),
    (NotificationCategory::NewFundraising, STORED),
    (NotificationCategory::FundraisingCompleted, STORED),
    (NotificationCategory::FundraisingDonation, PUSH_ONLY),
    (NotificationCategory::AdminNotification, STORED),
    (NotificationCategory::EventReminder, STORED),
    (NotificationCategory::ProjectDeadline, STORED),
    (NotificationCategory::SupportReply, STORED),
    (NotificationCategory::Achievement, STORED),
    (NotificationCategory::TaskCompleted, STORED),
    (NotificationCategory::TaskConfirmed, STORED),
    (NotificationCategory::ReportCreated, STORED),
    (NotificationCategory::LevelUp, STORED),
    (NotificationCategory::TournamentSeasonStart, STORED),
    (NotificationCategory::TournamentMedal, STORED),
];

impl NotificationCategory {
    /// Wire name, also the key in a user's preference map.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Chat => "chat",
            NotificationCategory::FundraisingApplication => "fundraisingApplication",
            NotificationCategory::FundraisingApplicationEdit => "fundraisingApplicationEdit",
            NotificationCategory::ProjectApplication => "projectApplication",
            NotificationCategory::ProjectApplicationEdit => "projectApplicationEdit",
            NotificationCategory::FriendRequest => "friendRequest",
            NotificationCategory::FriendRequestEdit => "friendRequestEdit",
            NotificationCategory::RaffleWinner => "raffleWinner",
            NotificationCategory::EventUpdate => "eventUpdate",
            NotificationCategory::NewFundraising => "newFundraising",
            NotificationCategory::FundraisingCompleted => "fundraisingCompleted",
            NotificationCategory::FundraisingDonation => "fundraisingDonation",
            NotificationCategory::AdminNotification => "adminNotification",
            NotificationCategory::EventReminder => "eventReminder",
            NotificationCategory::ProjectDeadline => "projectDeadline",
            NotificationCategory::SupportReply => "supportReply",
            NotificationCategory::Achievement => "achievement",
            NotificationCategory::TaskCompleted => "taskCompleted",
            NotificationCategory::TaskConfirmed => "taskConfirmed",
            NotificationCategory::ReportCreated => "reportCreated",
            NotificationCategory::LevelUp => "levelUp",
            NotificationCategory::TournamentSeasonStart => "tournamentSeasonStart",
            NotificationCategory::TournamentMedal => "tournamentMedal",
        }
    }

    pub fn policy(&self) -> CategoryPolicy {
        POLICY_TABLE
            .iter()
            .find(|(category, _)| category == self)
            .map(|(_, policy)| *policy)
            .unwrap_or(STORED)
    }

    pub fn all() -> impl Iterator<Item = NotificationCategory> {
        POLICY_TABLE.iter().map(|(category, _)| *category)
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseError::Category(s.to_string()))
    }
}
