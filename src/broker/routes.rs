use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RelayError;
use crate::server::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub ok: bool,
    pub token: String,
    pub expires_in_sec: u64,
}

/// POST /stt/token
pub async fn issue_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let session_id = match payload {
        Ok(Json(TokenRequest { session_id: Some(session_id) })) => session_id,
        Ok(_) => return RelayError::InvalidArgument("sessionId is required".to_string()).into_response(),
        Err(rejection) => {
            debug!("token request rejected: {}", rejection.body_text());
            return RelayError::InvalidArgument(rejection.body_text()).into_response();
        }
    };

    match state.issuer.issue(&session_id).await {
        Ok(issued) => Json(TokenResponse {
            ok: true,
            token: issued.token,
            expires_in_sec: issued.expires_in_sec,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
