use helphub_store::StoreError;
use thiserror::Error;

use crate::push::PushError;

/// Errors produced by the engine.
///
/// Absent users and ineligible roles are not errors; they surface as
/// outcome values and are skipped.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A store read or batch write failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The push transport could not be set up.
    #[error("Push error: {0}")]
    Push(#[from] PushError),

    /// A trigger payload is structurally unusable.
    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
