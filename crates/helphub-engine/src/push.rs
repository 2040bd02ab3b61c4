//! Push-delivery transports.
//!
//! The dispatcher hands one [`PushMessage`] per recipient to a
//! [`PushTransport`]; each send succeeds or fails on its own.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use helphub_shared::constants::DEFAULT_ANDROID_CHANNEL;

use crate::dispatcher::Notification;
use crate::error::{EngineError, Result};

/// Failure of a single push send.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push gateway rejected the message with status {0}")]
    Rejected(u16),
}

/// Delivery hints attached uniformly to every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformHints {
    pub android_priority: String,
    pub android_channel: String,
    pub sound: String,
    pub badge: u32,
}

impl Default for PlatformHints {
    fn default() -> Self {
        Self {
            android_priority: "high".into(),
            android_channel: DEFAULT_ANDROID_CHANNEL.into(),
            sound: "default".into(),
            badge: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AndroidConfig {
    pub priority: String,
    pub channel_id: String,
    pub sound: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApnsConfig {
    pub sound: String,
    pub badge: u32,
}

/// One message for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    /// The category under `type`, then every payload entry.
    pub data: BTreeMap<String, String>,
    pub android: AndroidConfig,
    pub apns: ApnsConfig,
}

impl PushMessage {
    pub fn new(token: &str, notification: &Notification, hints: &PlatformHints) -> Self {
        let mut data = BTreeMap::new();
        data.insert("type".to_string(), notification.category.as_str().to_string());
        for (key, value) in notification.payload.iter() {
            data.insert(key.clone(), value.clone());
        }

        Self {
            token: token.to_string(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            data,
            android: AndroidConfig {
                priority: hints.android_priority.clone(),
                channel_id: hints.android_channel.clone(),
                sound: hints.sound.clone(),
            },
            apns: ApnsConfig {
                sound: hints.sound.clone(),
                badge: hints.badge,
            },
        }
    }
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, message: &PushMessage) -> std::result::Result<(), PushError>;
}

// ---------------------------------------------------------------------------
// HTTP gateway
// ---------------------------------------------------------------------------

/// Posts each message as JSON to a push gateway.
pub struct HttpPushTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    auth_token: Option<String>,
}

impl HttpPushTransport {
    pub fn new(endpoint: &str, auth_token: Option<String>) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| EngineError::Config(format!("invalid push endpoint {endpoint}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(PushError::from)?;

        Ok(Self {
            client,
            endpoint,
            auth_token,
        })
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(&self, message: &PushMessage) -> std::result::Result<(), PushError> {
        let mut request = self.client.post(self.endpoint.clone()).json(message);
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(PushError::Rejected(resp.status().as_u16()));
        }
        debug!(category = %message.data.get("type").map(String::as_str).unwrap_or(""), "push sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log-only transport (development)
// ---------------------------------------------------------------------------

pub struct LogPushTransport;

#[async_trait]
impl PushTransport for LogPushTransport {
    async fn send(&self, message: &PushMessage) -> std::result::Result<(), PushError> {
        info!(title = %message.title, data = ?message.data, "push (log only)");
        Ok(())
    }
}

/// HTTP transport when an endpoint is configured, log-only otherwise.
pub fn transport_for(
    endpoint: Option<&str>,
    auth_token: Option<String>,
) -> Result<Arc<dyn PushTransport>> {
    match endpoint {
        Some(endpoint) => Ok(Arc::new(HttpPushTransport::new(endpoint, auth_token)?)),
        None => Ok(Arc::new(LogPushTransport)),
    }
}
