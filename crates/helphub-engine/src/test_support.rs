//! Fixtures shared by the engine tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

use helphub_shared::Role;
use helphub_store::{Database, User};

use crate::achievements::AchievementUnlocked;
use crate::assets::DirectoryIconResolver;
use crate::push::{PlatformHints, PushError, PushMessage, PushTransport};
use crate::tournament::TournamentSettings;
use crate::{Engine, SharedDatabase};

/// Records every message; fails for chosen tokens.
#[derive(Default)]
pub struct RecordingTransport {
    sent: StdMutex<Vec<PushMessage>>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        if self.failing.contains(&message.token) {
            return Err(PushError::Rejected(500));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct Harness {
    pub db: SharedDatabase,
    pub transport: Arc<RecordingTransport>,
    pub engine: Engine,
    /// Unlock events; the rewarder is not running in tests.
    pub unlocks: mpsc::UnboundedReceiver<AchievementUnlocked>,
    _dir: TempDir,
}

pub fn harness() -> Harness {
    build(TournamentSettings::default(), &[])
}

pub fn harness_with(settings: TournamentSettings) -> Harness {
    build(settings, &[])
}

pub fn harness_with_failing(tokens: &[&str]) -> Harness {
    build(TournamentSettings::default(), tokens)
}

fn build(settings: TournamentSettings, failing: &[&str]) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("engine.db")).unwrap();
    let db: SharedDatabase = Arc::new(Mutex::new(db));

    let transport = Arc::new(RecordingTransport {
        sent: StdMutex::new(Vec::new()),
        failing: failing.iter().map(|t| t.to_string()).collect(),
    });
    let icons = Arc::new(DirectoryIconResolver::new(dir.path().join("assets"), "/assets"));

    let (engine, unlocks) = Engine::new(
        db.clone(),
        transport.clone(),
        PlatformHints::default(),
        icons,
        settings,
    );

    Harness {
        db,
        transport,
        engine,
        unlocks,
        _dir: dir,
    }
}

pub async fn seed_user(db: &SharedDatabase, id: &str, role: Role, push_token: Option<&str>) {
    let mut user = User::new(id, role);
    user.push_token = push_token.map(str::to_string);
    db.lock().await.upsert_user(&user).unwrap();
}
