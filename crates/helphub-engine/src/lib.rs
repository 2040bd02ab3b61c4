//! # helphub-engine
//!
//! Gamification and notification dispatch for the HelpHub volunteering
//! platform:
//!
//! - [`dispatcher`]: preference-filtered fan-out that persists in-app
//!   notification records in one batch and then sends pushes concurrently
//! - [`ledger`]: points, season points and levels
//! - [`achievements`]: idempotent unlocks, attendance ladder, marathoner
//!   and the capstone, plus the rewarder that turns unlocks into points
//! - [`tournament`]: monthly group formation and medal settlement
//! - [`triggers`] and [`sweeps`]: handlers for domain triggers and the
//!   daily calendar jobs
//!
//! All state lives in a [`helphub_store::Database`] shared behind an async
//! mutex.

pub mod achievements;
pub mod assets;
pub mod dispatcher;
pub mod ledger;
pub mod push;
pub mod sweeps;
pub mod tournament;
pub mod triggers;

mod error;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use helphub_store::Database;

pub use error::{EngineError, Result};

use crate::achievements::{AchievementEngine, AchievementUnlocked};
use crate::assets::MedalIconResolver;
use crate::dispatcher::Dispatcher;
use crate::ledger::Ledger;
use crate::push::{PlatformHints, PushTransport};
use crate::tournament::{TournamentManager, TournamentSettings};

/// Store handle shared by every component.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// All engine components wired to one store and one push transport.
#[derive(Clone)]
pub struct Engine {
    db: SharedDatabase,
    dispatcher: Dispatcher,
    ledger: Ledger,
    achievements: AchievementEngine,
    tournament: TournamentManager,
}

impl Engine {
    /// Build the engine. The returned receiver yields one event per new
    /// achievement unlock and should be handed to
    /// [`achievements::spawn_unlock_rewards`].
    pub fn new(
        db: SharedDatabase,
        transport: Arc<dyn PushTransport>,
        hints: PlatformHints,
        icons: Arc<dyn MedalIconResolver>,
        settings: TournamentSettings,
    ) -> (Self, mpsc::UnboundedReceiver<AchievementUnlocked>) {
        let (unlock_tx, unlock_rx) = mpsc::unbounded_channel();

        let dispatcher = Dispatcher::new(db.clone(), transport, hints);
        let ledger = Ledger::new(db.clone(), dispatcher.clone());
        let achievements = AchievementEngine::new(db.clone(), dispatcher.clone(), unlock_tx);
        let tournament = TournamentManager::new(db.clone(), dispatcher.clone(), icons, settings);

        let engine = Self {
            db,
            dispatcher,
            ledger,
            achievements,
            tournament,
        };
        (engine, unlock_rx)
    }

    pub fn db(&self) -> &SharedDatabase {
        &self.db
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn achievements(&self) -> &AchievementEngine {
        &self.achievements
    }

    pub fn tournament(&self) -> &TournamentManager {
        &self.tournament
    }
}
