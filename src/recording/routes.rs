use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::RelayError;
use crate::observability::metrics::get_metrics;
use crate::recording::client::RecordingClient;
use crate::server::server::AppState;
use crate::utils::constants::{DEFAULT_CANDIDATE_NAME, ROOM_MINUTES_ALLOWED, ROOM_MINUTES_DEFAULT};

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub sid: Option<String>,
    pub minutes: Option<i64>,
    pub candidate_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub ok: bool,
    pub room_name: String,
    pub join_url: String,
}

#[derive(Debug, Deserialize)]
pub struct LatestRecordingParams {
    pub room_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LatestRecordingResponse {
    pub ok: bool,
    pub recording_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordingLinkParams {
    pub recording_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordingLinkResponse {
    pub ok: bool,
    pub mp4_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

/// Routes for the recording provider; mounted only when it is configured.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-room", post(create_room))
        .route("/latest-recording", get(latest_recording))
        .route("/recording-link", get(recording_link))
}

/// Only 15 and 30 minute rooms exist; anything else becomes 15.
pub fn normalize_minutes(minutes: Option<i64>) -> u32 {
    minutes
        .and_then(|m| u32::try_from(m).ok())
        .filter(|m| ROOM_MINUTES_ALLOWED.contains(m))
        .unwrap_or(ROOM_MINUTES_DEFAULT)
}

fn failure(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "ok": false, "error": error }))).into_response()
}

fn upstream_failure(route: &str, err: &RelayError) -> Response {
    warn!(route, "recording provider call failed: {}", err);
    match err {
        RelayError::UpstreamFailure(_) => failure(StatusCode::BAD_GATEWAY, err.code()),
        _ => failure(err.status(), err.code()),
    }
}

fn recording_client(state: &AppState) -> Result<&RecordingClient, Response> {
    state
        .recording
        .as_ref()
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "recording_not_configured"))
}

async fn observe(route: &str, outcome: &str, start: Instant) {
    let metrics = get_metrics().await;
    metrics.recording_requests.with_label_values(&[route, outcome]).inc();
    metrics
        .recording_duration
        .with_label_values(&[route])
        .observe(start.elapsed().as_secs_f64());
}

/// POST /create-room
pub async fn create_room(
    State(state): State<AppState>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Response {
    const ROUTE: &str = "create_room";
    let client = match recording_client(&state) {
        Ok(client) => client,
        Err(response) => return response,
    };
    let req = match payload {
        Ok(Json(req)) => req,
        Err(_) => return failure(StatusCode::BAD_REQUEST, "invalid_argument"),
    };

    let sid = req.sid.as_deref().map(str::trim).unwrap_or_default();
    if sid.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "sid_required");
    }
    let minutes = normalize_minutes(req.minutes);
    let candidate_name = req
        .candidate_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_CANDIDATE_NAME);

    let start = Instant::now();
    match client.create_room(sid, minutes, candidate_name).await {
        Ok(room) => {
            observe(ROUTE, "ok", start).await;
            info!(sid, room_name = %room.room_name, minutes, "interview room created");
            Json(CreateRoomResponse { ok: true, room_name: room.room_name, join_url: room.join_url }).into_response()
        }
        Err(err) => {
            observe(ROUTE, "error", start).await;
            get_metrics().await.upstream_failures.with_label_values(&["recording"]).inc();
            upstream_failure(ROUTE, &err)
        }
    }
}

/// GET /latest-recording?room_name=...
pub async fn latest_recording(
    State(state): State<AppState>,
    Query(params): Query<LatestRecordingParams>,
) -> Response {
    const ROUTE: &str = "latest_recording";
    let client = match recording_client(&state) {
        Ok(client) => client,
        Err(response) => return response,
    };
    let room_name = params.room_name.as_deref().map(str::trim).unwrap_or_default();
    if room_name.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "room_name_required");
    }

    let start = Instant::now();
    match client.latest_recording(room_name).await {
        Ok(Some(recording)) => {
            observe(ROUTE, "ok", start).await;
            Json(LatestRecordingResponse { ok: true, recording_id: recording.id, status: recording.status }).into_response()
        }
        Ok(None) => {
            observe(ROUTE, "not_found", start).await;
            failure(StatusCode::NOT_FOUND, "recording_not_found")
        }
        Err(err) => {
            observe(ROUTE, "error", start).await;
            get_metrics().await.upstream_failures.with_label_values(&["recording"]).inc();
            upstream_failure(ROUTE, &err)
        }
    }
}

/// GET /recording-link?recording_id=...
pub async fn recording_link(
    State(state): State<AppState>,
    Query(params): Query<RecordingLinkParams>,
) -> Response {
    const ROUTE: &str = "recording_link";
    let client = match recording_client(&state) {
        Ok(client) => client,
        Err(response) => return response,
    };
    let recording_id = params.recording_id.as_deref().map(str::trim).unwrap_or_default();
    if recording_id.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "recording_id_required");
    }

    let start = Instant::now();
    match client.recording_link(recording_id).await {
        Ok(link) => {
            observe(ROUTE, "ok", start).await;
            Json(RecordingLinkResponse { ok: true, mp4_url: link.download_link, expires: link.expires }).into_response()
        }
        Err(err) => {
            observe(ROUTE, "error", start).await;
            get_metrics().await.upstream_failures.with_label_values(&["recording"]).inc();
            upstream_failure(ROUTE, &err)
        }
    }
}
