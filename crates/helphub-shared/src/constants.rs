/// Default Android notification channel for push hints
pub const DEFAULT_ANDROID_CHANNEL: &str = "helphub_channel";

/// Default target size of a tournament group
pub const DEFAULT_GROUP_SIZE: usize = 100;

/// Default number of ranked places per group that receive a medal
pub const DEFAULT_MEDAL_CUTOFF: usize = 10;

/// Number of distinct unlocked achievements that grants the capstone
/// (every defined achievement except the capstone itself)
pub const CAPSTONE_THRESHOLD: usize = 10;

/// Trailing window inspected by the marathoner check, in days
pub const MARATHON_WINDOW_DAYS: i64 = 30;

/// Distinct week buckets required by the marathoner check
pub const MARATHON_WEEKS_REQUIRED: usize = 4;

/// Points for taking part in a completed event
pub const POINTS_EVENT_PARTICIPATION: i64 = 10;

/// Points for organizing an event
pub const POINTS_EVENT_CREATED: i64 = 20;

/// Points for creating a project
pub const POINTS_PROJECT_CREATED: i64 = 25;

/// Points for an approved project application
pub const POINTS_APPLICATION_APPROVED: i64 = 3;

/// Points for a confirmed project task
pub const POINTS_TASK_CONFIRMED: i64 = 10;

/// Points for adding a friend
pub const POINTS_FRIEND_ADDED: i64 = 2;

/// Points for publishing a report
pub const POINTS_REPORT_PUBLISHED: i64 = 10;

/// Extra points for a report that carries photos
pub const POINTS_REPORT_PHOTOS: i64 = 5;

/// Points for leaving feedback to an organizer
pub const POINTS_ORGANIZER_FEEDBACK: i64 = 5;

/// Donated amount (UAH) that earns one point
pub const DONATION_UNIT_PER_POINT: i64 = 100;

/// Lifetime donated amount (UAH) that unlocks "philanthropist"
pub const PHILANTHROPIST_TOTAL: i64 = 1000;

/// Lifetime friend count that unlocks "community_fan"
pub const COMMUNITY_FAN_FRIENDS: u32 = 5;

/// Distinct approved projects that unlock "team_player"
pub const TEAM_PLAYER_PROJECTS: u32 = 3;
