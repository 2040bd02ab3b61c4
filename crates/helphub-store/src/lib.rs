//! # helphub-store
//!
//! Document store for the HelpHub gamification and notification engine,
//! backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers per collection. Every
//! multi-write batch the engine needs (a dispatch's notification records, a
//! tournament group with its member pointers, a group's medals) is one
//! SQLite transaction: all rows land or none do.

pub mod achievements;
pub mod database;
pub mod events;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod points;
pub mod processed_events;
pub mod tasks;
pub mod tournaments;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
