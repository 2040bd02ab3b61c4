//! Achievement catalog.

/// One named achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Points awarded when the unlock record is created.
    pub points: i64,
}

pub const NEWCOMER: &str = "newcomer";
pub const ACTIVIST: &str = "activist";
pub const EVENT_VETERAN: &str = "event_veteran";
pub const TEAM_PLAYER: &str = "team_player";
pub const PROJECT_LEADER: &str = "project_leader";
pub const DONATOR: &str = "donator";
pub const PHILANTHROPIST: &str = "philanthropist";
pub const COMMUNITY_FAN: &str = "community_fan";
pub const MARATHONER: &str = "marathoner";
pub const PHOTOGRAPHER: &str = "photographer";
/// The capstone, unlocked once every other achievement is held.
pub const SECRET_MASTER: &str = "secret_master";

/// Description used for ids missing from the catalog.
pub const FALLBACK_DESCRIPTION: &str = "Congratulations!";

/// Points used for ids missing from the catalog.
pub const FALLBACK_POINTS: i64 = 5;

pub static CATALOG: &[AchievementDef] = &[
    AchievementDef {
        id: NEWCOMER,
        title: "Newcomer",
        description: "Take part in your first event",
        points: 5,
    },
    AchievementDef {
        id: ACTIVIST,
        title: "Activist",
        description: "Take part in 5 events",
        points: 10,
    },
    AchievementDef {
        id: EVENT_VETERAN,
        title: "Event Veteran",
        description: "Take part in 20 events",
        points: 15,
    },
    AchievementDef {
        id: TEAM_PLAYER,
        title: "Team Player",
        description: "Join 3 different projects",
        points: 10,
    },
    AchievementDef {
        id: PROJECT_LEADER,
        title: "Project Leader",
        description: "Complete a project as organizer",
        points: 15,
    },
    AchievementDef {
        id: DONATOR,
        title: "Donator",
        description: "Make your first donation",
        points: 5,
    },
    AchievementDef {
        id: PHILANTHROPIST,
        title: "Philanthropist",
        description: "Donate more than 1000 UAH",
        points: 20,
    },
    AchievementDef {
        id: COMMUNITY_FAN,
        title: "Community Fan",
        description: "Add 5 friends",
        points: 10,
    },
    AchievementDef {
        id: MARATHONER,
        title: "Marathoner",
        description: "Take part in events every week for a month",
        points: 15,
    },
    AchievementDef {
        id: PHOTOGRAPHER,
        title: "Photographer",
        description: "Add a photo to a report",
        points: 5,
    },
    AchievementDef {
        id: SECRET_MASTER,
        title: "Achievement Master",
        description: "Unlock all other achievements",
        points: 20,
    },
];

/// Event-attendance ladder: (minimum attended events, achievement id).
pub static ATTENDANCE_LADDER: &[(u32, &str)] = &[(1, NEWCOMER), (5, ACTIVIST), (20, EVENT_VETERAN)];

pub fn find(id: &str) -> Option<&'static AchievementDef> {
    CATALOG.iter().find(|def| def.id == id)
}

pub fn description_for(id: &str) -> &'static str {
    find(id).map(|def| def.description).unwrap_or(FALLBACK_DESCRIPTION)
}

pub fn points_for(id: &str) -> i64 {
    find(id).map(|def| def.points).unwrap_or(FALLBACK_POINTS)
}

/// Catalog title, or the id itself for unknown achievements.
pub fn title_for(id: &str) -> &str {
    find(id).map(|def| def.title).unwrap_or(id)
}
