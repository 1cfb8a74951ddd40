//! Error taxonomy shared by the broker, the relay and the recording pass-through.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or mismatching shared secret.
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown, already consumed or expired relay token.
    #[error("invalid or expired token")]
    TokenInvalid,

    /// Provider connect, handshake or HTTP failure.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RelayError::TokenInvalid => StatusCode::UNAUTHORIZED,
            RelayError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            RelayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code written to the wire.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Unauthorized => "unauthorized",
            RelayError::InvalidArgument(_) => "invalid_argument",
            RelayError::TokenInvalid => "invalid_or_expired_token",
            RelayError::UpstreamFailure(_) => "upstream_failure",
            RelayError::Config(_) => "internal_error",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::UpstreamFailure(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RelayError::UpstreamFailure(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.code() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_contract() {
        assert_eq!(RelayError::Unauthorized.code(), "unauthorized");
        assert_eq!(RelayError::InvalidArgument("x".into()).code(), "invalid_argument");
        assert_eq!(RelayError::TokenInvalid.code(), "invalid_or_expired_token");
        assert_eq!(RelayError::UpstreamFailure("x".into()).code(), "upstream_failure");
    }

    #[test]
    fn statuses() {
        assert_eq!(RelayError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(RelayError::InvalidArgument("empty".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::UpstreamFailure("timeout".into()).status(), StatusCode::BAD_GATEWAY);
    }
}
