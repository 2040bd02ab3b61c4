use thiserror::Error;

/// Failure to parse one of the shared enums from its wire name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown role: {0}")]
    Role(String),

    #[error("Unknown notification category: {0}")]
    Category(String),

    #[error("Unknown medal tier: {0}")]
    MedalTier(String),

    #[error("Unknown task status: {0}")]
    TaskStatus(String),

    #[error("Invalid season id: {0}")]
    SeasonId(String),
}
