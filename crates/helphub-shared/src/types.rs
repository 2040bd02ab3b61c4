use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Account role. Only volunteers take part in points, achievements and
/// tournaments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Volunteer,
    Organization,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Volunteer => "volunteer",
            Role::Organization => "organization",
            Role::Admin => "admin",
        }
    }

    /// Whether this role accrues points and unlocks achievements.
    pub fn is_point_eligible(&self) -> bool {
        matches!(self, Role::Volunteer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volunteer" => Ok(Role::Volunteer),
            "organization" => Ok(Role::Organization),
            "admin" => Ok(Role::Admin),
            other => Err(ParseError::Role(other.to_string())),
        }
    }
}

/// Medal classification assigned by in-group rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedalTier {
    Gold,
    Silver,
    Bronze,
}

impl MedalTier {
    /// Tier for a 1-based rank inside the ranked subset.
    pub fn for_place(place: usize) -> Self {
        match place {
            1 => MedalTier::Gold,
            2 => MedalTier::Silver,
            _ => MedalTier::Bronze,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MedalTier::Gold => "gold",
            MedalTier::Silver => "silver",
            MedalTier::Bronze => "bronze",
        }
    }
}

impl fmt::Display for MedalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedalTier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gold" => Ok(MedalTier::Gold),
            "silver" => Ok(MedalTier::Silver),
            "bronze" => Ok(MedalTier::Bronze),
            other => Err(ParseError::MedalTier(other.to_string())),
        }
    }
}

/// Lifecycle of a project task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    /// Done by the volunteer, waiting for the organizer.
    Completed,
    /// Accepted by the organizer.
    Confirmed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Confirmed => "confirmed",
        }
    }

    /// Completed and confirmed tasks no longer get deadline reminders.
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Confirmed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "confirmed" => Ok(TaskStatus::Confirmed),
            other => Err(ParseError::TaskStatus(other.to_string())),
        }
    }
}

/// Tournament period identifier, `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonId(String);

impl SeasonId {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{}-{:02}", date.year(), date.month()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SeasonId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == 7
            && s.as_bytes()[4] == b'-'
            && s[..4].chars().all(|c| c.is_ascii_digit())
            && matches!(s[5..].parse::<u32>(), Ok(1..=12));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ParseError::SeasonId(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_volunteers_are_point_eligible() {
        assert!(Role::Volunteer.is_point_eligible());
        assert!(!Role::Organization.is_point_eligible());
        assert!(!Role::Admin.is_point_eligible());
    }

    #[test]
    fn task_status_wire_names() {
        for status in [
            TaskStatus::Open,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Confirmed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!(!TaskStatus::InProgress.is_finished());
        assert!(TaskStatus::Confirmed.is_finished());
    }

    #[test]
    fn role_parses_wire_names() {
        assert_eq!("organization".parse::<Role>().unwrap(), Role::Organization);
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn tier_by_place() {
        assert_eq!(MedalTier::for_place(1), MedalTier::Gold);
        assert_eq!(MedalTier::for_place(2), MedalTier::Silver);
        assert_eq!(MedalTier::for_place(3), MedalTier::Bronze);
        assert_eq!(MedalTier::for_place(10), MedalTier::Bronze);
    }

    #[test]
    fn season_id_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
        assert_eq!(SeasonId::from_date(date).as_str(), "2026-03");
    }

    #[test]
    fn season_id_rejects_bad_month() {
        assert!("2026-13".parse::<SeasonId>().is_err());
        assert!("2026/01".parse::<SeasonId>().is_err());
        assert_eq!("2026-01".parse::<SeasonId>().unwrap().as_str(), "2026-01");
    }
}
