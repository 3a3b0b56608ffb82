//! Axum-based HTTP channel: the JSON API the web chat widget talks to.
//!
//! ```text
//! GET  /health          → {"status":"ok"}
//! GET  /api/chat        → chat snapshot
//! PUT  /api/chat/input  → set the input buffer, returns the snapshot
//! PUT  /api/chat/open   → open or close the chat window, returns the snapshot
//! POST /api/chat        → submit text (or the buffer); returns the snapshot
//!                         once the reply settles. 409 while a reply is
//!                         pending, 422 for blank text.
//! ```
//!
//! The snapshot is `{ messages: [{role, text, isError?}], busy, input, open }`.
//! Submitted text is stored as sent; only the blank check trims it.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::AppError;

use super::{Component, ComponentFuture, Rejected, SharedController, begin, finish};

// ── Shared request state ──────────────────────────────────────────────────────

/// Injected into every handler. Cheap to clone.
#[derive(Clone)]
pub(crate) struct AxumState {
    /// Channel identifier used in log fields.
    pub channel_id: Arc<str>,
    pub controller: SharedController,
}

// ── AxumChannel ───────────────────────────────────────────────────────────────

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    controller: SharedController,
}

impl AxumChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        controller: SharedController,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            bind_addr: bind_addr.into(),
            controller,
        }
    }
}

impl Component for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_axum(self.channel_id, self.bind_addr, self.controller, shutdown))
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

async fn run_axum(
    channel_id: String,
    bind_addr: String,
    controller: SharedController,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let state = AxumState {
        channel_id: Arc::from(channel_id.as_str()),
        controller,
    };

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("http bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "http channel listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("http server error: {e}")))?;

    info!(%channel_id, "http channel shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub(crate) fn build_router(state: AxumState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", get(chat).post(submit))
        .route("/api/chat/input", axum::routing::put(set_input))
        .route("/api/chat/open", axum::routing::put(set_open))
        .with_state(state)
}

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SubmitRequest {
    /// Absent → submit the input buffer.
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct InputRequest {
    input: String,
}

#[derive(Deserialize)]
struct OpenRequest {
    open: bool,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/chat
async fn chat(State(state): State<AxumState>) -> Response {
    let snapshot = state.controller.lock().await.snapshot();
    (StatusCode::OK, Json(snapshot)).into_response()
}

/// PUT /api/chat/input: the input field stays editable while a reply is pending.
async fn set_input(State(state): State<AxumState>, Json(req): Json<InputRequest>) -> Response {
    let snapshot = {
        let mut ctl = state.controller.lock().await;
        ctl.set_input(req.input);
        ctl.snapshot()
    };
    (StatusCode::OK, Json(snapshot)).into_response()
}

/// PUT /api/chat/open
async fn set_open(State(state): State<AxumState>, Json(req): Json<OpenRequest>) -> Response {
    let snapshot = {
        let mut ctl = state.controller.lock().await;
        ctl.set_open(req.open);
        ctl.snapshot()
    };
    debug!(channel_id = %state.channel_id, open = req.open, "chat window toggled");
    (StatusCode::OK, Json(snapshot)).into_response()
}

/// POST /api/chat
async fn submit(State(state): State<AxumState>, Json(req): Json<SubmitRequest>) -> Response {
    let pending = match begin(&state.controller, req.text.as_deref()).await {
        Ok(pending) => pending,
        Err(Rejected::Busy) => {
            debug!(channel_id = %state.channel_id, "submit rejected, reply pending");
            let snapshot = state.controller.lock().await.snapshot();
            return (StatusCode::CONFLICT, Json(snapshot)).into_response();
        }
        Err(Rejected::Blank) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                json_error("blank", "message text is empty"),
            )
                .into_response();
        }
    };

    if let Err(e) = finish(&state.controller, pending).await {
        error!(channel_id = %state.channel_id, "reply did not settle: {e}");
        return (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response();
    }

    let snapshot = state.controller.lock().await.snapshot();
    (StatusCode::OK, Json(snapshot)).into_response()
}
