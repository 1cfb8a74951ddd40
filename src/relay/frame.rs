use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// Frames the relay writes to the downstream (browser) connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayFrame {
    Ready,
    Data { payload: Value },
    Error { error: RelayErrorCode },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayErrorCode {
    InvalidOrExpiredToken,
    UpstreamFailure,
}

impl From<&RelayError> for RelayErrorCode {
    fn from(err: &RelayError) -> Self {
        match err {
            RelayError::TokenInvalid | RelayError::InvalidArgument(_) => RelayErrorCode::InvalidOrExpiredToken,
            _ => RelayErrorCode::UpstreamFailure,
        }
    }
}

impl RelayFrame {
    pub fn error(code: RelayErrorCode) -> Self {
        RelayFrame::Error { error: code }
    }

    /// Wrap an upstream frame. Anything that is not JSON yields `None` and is
    /// dropped by the caller; the provider only ever sends JSON results.
    pub fn from_upstream(raw: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Value>(raw)
            .ok()
            .map(|payload| RelayFrame::Data { payload })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
