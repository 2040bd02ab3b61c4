//! # helphub-shared
//!
//! Domain vocabulary shared by the store, the engine and the server:
//! user roles, notification categories and their delivery policy, the
//! string-valued notification payload, tournament season identifiers,
//! the leveling table and the achievement catalog.

pub mod achievements;
pub mod category;
pub mod constants;
pub mod error;
pub mod levels;
pub mod payload;
pub mod types;

pub use category::{CategoryPolicy, NotificationCategory};
pub use error::ParseError;
pub use levels::{level_for, level_info, LevelInfo};
pub use payload::Payload;
pub use types::{MedalTier, Role, SeasonId, TaskStatus};
