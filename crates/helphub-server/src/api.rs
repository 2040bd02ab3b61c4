use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use helphub_engine::dispatcher::DispatchReport;
use helphub_engine::triggers::{Trigger, TriggerReport};
use helphub_engine::Engine;
use helphub_shared::{NotificationCategory, Payload};
use helphub_store::NotificationRecord;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::scheduler::{self, Job};

const DEFAULT_INBOX_LIMIT: u32 = 50;
const MAX_INBOX_LIMIT: u32 = 200;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/triggers", post(deliver_trigger))
        .route("/notifications/send", post(send_notification))
        .route("/admin/jobs/:job", post(run_job))
        .route("/users/:id/notifications", get(list_notifications))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct SendRequest {
    user_ids: Vec<String>,
    title: String,
    body: String,
    category: NotificationCategory,
    #[serde(default)]
    data: Payload,
}

#[derive(Deserialize)]
struct JobQuery {
    /// Local date to run for; today in the scheduling calendar when absent.
    date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct JobResponse {
    job: &'static str,
    date: NaiveDate,
    summary: serde_json::Value,
}

#[derive(Deserialize)]
struct InboxQuery {
    limit: Option<u32>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn deliver_trigger(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(trigger): Json<Trigger>,
) -> Result<Json<TriggerReport>, ServerError> {
    verify_api_token(&headers, &state.config)?;

    let report = state.engine.handle(trigger).await?;
    Ok(Json(report))
}

async fn send_notification(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<DispatchReport>, ServerError> {
    verify_api_token(&headers, &state.config)?;

    let report = state
        .engine
        .handle(Trigger::Notify {
            user_ids: req.user_ids,
            title: req.title,
            body: req.body,
            category: req.category,
            data: req.data,
        })
        .await?;

    Ok(Json(report.dispatch.unwrap_or_default()))
}

async fn run_job(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(job): Path<String>,
    Query(query): Query<JobQuery>,
) -> Result<Json<JobResponse>, ServerError> {
    verify_api_token(&headers, &state.config)?;

    let job: Job = job.parse().map_err(ServerError::NotFound)?;
    let offset = state.config.utc_offset();
    let date = query
        .date
        .unwrap_or_else(|| scheduler::local_today(Utc::now(), offset));

    info!(%job, %date, "Running job on request");
    let summary = scheduler::run_job(&state.engine, job, date, offset).await?;

    Ok(Json(JobResponse {
        job: job.as_str(),
        date,
        summary,
    }))
}

async fn list_notifications(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Vec<NotificationRecord>>, ServerError> {
    verify_api_token(&headers, &state.config)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_INBOX_LIMIT)
        .clamp(1, MAX_INBOX_LIMIT);

    let db = state.engine.db().lock().await;
    if db.find_user(&user_id)?.is_none() {
        return Err(ServerError::NotFound(format!("user {user_id}")));
    }
    let records = db.list_notifications(&user_id, limit)?;
    Ok(Json(records))
}

fn verify_api_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.api_token else {
        return Err(ServerError::Forbidden(
            "API is disabled (no API_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid API token".into()));
    }

    Ok(())
}

/// Start the HTTP API server.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
