//! Notification fan-out.
//!
//! A dispatch resolves its recipients, filters them by preference, writes
//! every notification record in one store batch and only then sends the
//! pushes. Push sends run concurrently and fail independently.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use helphub_shared::{NotificationCategory, Payload};
use helphub_store::NotificationRecord;

use crate::error::Result;
use crate::push::{PlatformHints, PushMessage, PushTransport};
use crate::SharedDatabase;

/// What to tell the recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    #[serde(default)]
    pub payload: Payload,
}

impl Notification {
    pub fn new(
        category: NotificationCategory,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            category,
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

/// Advisory per-call tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Distinct recipient ids requested.
    pub requested: usize,
    pub missing: usize,
    /// Recipients with the category switched off.
    pub disabled: usize,
    pub persisted: usize,
    pub push_success: usize,
    pub push_errors: usize,
}

#[derive(Clone)]
pub struct Dispatcher {
    db: SharedDatabase,
    transport: Arc<dyn PushTransport>,
    hints: PlatformHints,
}

impl Dispatcher {
    pub fn new(db: SharedDatabase, transport: Arc<dyn PushTransport>, hints: PlatformHints) -> Self {
        Self {
            db,
            transport,
            hints,
        }
    }

    /// Single-recipient convenience wrapper.
    pub async fn notify_user(&self, user_id: &str, notification: &Notification) -> Result<DispatchReport> {
        self.dispatch([user_id], notification).await
    }

    pub async fn dispatch<I, S>(&self, recipients: I, notification: &Notification) -> Result<DispatchReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let recipients: BTreeSet<String> = recipients
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        let policy = notification.category.policy();
        let mut report = DispatchReport {
            requested: recipients.len(),
            ..DispatchReport::default()
        };

        let mut records = Vec::new();
        let mut tokens = Vec::new();
        {
            let mut db = self.db.lock().await;

            for user_id in &recipients {
                let Some(user) = db.find_user(user_id)? else {
                    report.missing += 1;
                    continue;
                };
                if !user.category_enabled(notification.category) {
                    report.disabled += 1;
                    continue;
                }

                if policy.persist {
                    records.push(NotificationRecord {
                        id: Uuid::new_v4(),
                        user_id: user.id.clone(),
                        title: notification.title.clone(),
                        body: notification.body.clone(),
                        category: notification.category,
                        data: notification.payload.clone(),
                        is_read: false,
                        timestamp: Utc::now(),
                    });
                }
                if policy.push {
                    if let Some(token) = user.push_token.filter(|t| !t.is_empty()) {
                        tokens.push((user.id, token));
                    }
                }
            }

            // All records or none, before any push goes out.
            report.persisted = db.insert_notifications(&records)?;
        }

        let messages: Vec<(String, PushMessage)> = tokens
            .into_iter()
            .map(|(user_id, token)| {
                let msg = PushMessage::new(&token, notification, &self.hints);
                (user_id, msg)
            })
            .collect();

        let results = join_all(
            messages
                .iter()
                .map(|(_, msg)| self.transport.send(msg)),
        )
        .await;

        for ((user_id, _), result) in messages.iter().zip(results) {
            match result {
                Ok(()) => report.push_success += 1,
                Err(e) => {
                    report.push_errors += 1;
                    warn!(user = %user_id, category = %notification.category, error = %e, "push send failed");
                }
            }
        }

        info!(
            category = %notification.category,
            requested = report.requested,
            persisted = report.persisted,
            push_success = report.push_success,
            push_errors = report.push_errors,
            "dispatch finished"
        );
        Ok(report)
    }
}
