//! HTTP control surface.
//!
//! Every command route resolves the target channel's session, applies the
//! command, and returns the post-action state snapshot as JSON. Validation
//! failures come back as 400, unknown channels as 404.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use warden_core::{
    ChannelId, CommandError, MemberId, SessionRegistry, StateSnapshot, VoiceDirectory,
};

use crate::observers::{self, ObserverHub};

// ---------------------------------------------------------------------------
// State & routing
// ---------------------------------------------------------------------------

/// Shared handles every request needs.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub hub: Arc<ObserverHub>,
    pub directory: Arc<dyn VoiceDirectory>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/socket", get(observers::ws_handler))
        .route("/channels/:channel/game/start", post(start_game))
        .route("/channels/:channel/meeting/start", post(start_meeting))
        .route("/channels/:channel/meeting/end", post(end_meeting))
        .route("/channels/:channel/kill", post(kill))
        .route("/channels/:channel/unkill", post(unkill))
        .route("/channels/:channel/reset", post(reset))
        .route("/channels/:channel/state", get(channel_state))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError(CommandError);

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CommandError::Validation(_) => StatusCode::BAD_REQUEST,
            CommandError::UnknownChannel(_) => StatusCode::NOT_FOUND,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type CommandResult = Result<Json<StateSnapshot>, ApiError>;

#[derive(Debug, Deserialize)]
struct TargetMember {
    member_id: String,
}

impl TargetMember {
    fn parse(self) -> Result<MemberId, CommandError> {
        let id = self.member_id.trim();
        if id.is_empty() {
            return Err(CommandError::Validation("member_id is required".into()));
        }
        Ok(MemberId::new(id))
    }
}

async fn start_game(State(app): State<AppState>, Path(channel): Path<String>) -> CommandResult {
    let session = app.registry.get(&ChannelId::new(channel))?;
    Ok(Json(session.start_game().await))
}

async fn start_meeting(
    State(app): State<AppState>,
    Path(channel): Path<String>,
) -> CommandResult {
    let session = app.registry.get(&ChannelId::new(channel))?;
    Ok(Json(session.start_meeting().await))
}

async fn end_meeting(State(app): State<AppState>, Path(channel): Path<String>) -> CommandResult {
    let session = app.registry.get(&ChannelId::new(channel))?;
    Ok(Json(session.end_meeting().await))
}

async fn kill(
    State(app): State<AppState>,
    Path(channel): Path<String>,
    Json(body): Json<TargetMember>,
) -> CommandResult {
    let member = body.parse()?;
    let session = app.registry.get(&ChannelId::new(channel))?;
    Ok(Json(session.kill(member).await))
}

async fn unkill(
    State(app): State<AppState>,
    Path(channel): Path<String>,
    Json(body): Json<TargetMember>,
) -> CommandResult {
    let member = body.parse()?;
    let session = app.registry.get(&ChannelId::new(channel))?;
    Ok(Json(session.unkill(member).await))
}

async fn reset(State(app): State<AppState>, Path(channel): Path<String>) -> CommandResult {
    let session = app.registry.get(&ChannelId::new(channel))?;
    Ok(Json(session.reset().await))
}

async fn channel_state(
    State(app): State<AppState>,
    Path(channel): Path<String>,
) -> CommandResult {
    let session = app.registry.get(&ChannelId::new(channel))?;
    Ok(Json(session.state().await))
}
