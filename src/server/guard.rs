use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{HeaderMap, HeaderName};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::RelayError;
use crate::observability::metrics::get_metrics;

/// Pre-shared secret check for server-to-server endpoints.
#[derive(Clone)]
pub struct SharedSecretGuard {
    header: HeaderName,
    secret: Arc<[u8]>,
}

impl SharedSecretGuard {
    pub fn new(header: &str, secret: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|err| anyhow!("invalid shared secret header '{}': {}", header, err))?;
        if secret.is_empty() {
            return Err(anyhow!("shared secret must not be empty"));
        }
        Ok(Self { header, secret: Arc::from(secret.as_bytes()) })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Constant-time comparison of the presented value against the secret.
    pub fn verify(&self, headers: &HeaderMap) -> bool {
        match headers.get(&self.header) {
            Some(value) => bool::from(value.as_bytes().ct_eq(&self.secret)),
            None => false,
        }
    }
}

/// Middleware: reject with 401 before the handler runs.
pub async fn require_shared_secret(
    State(guard): State<SharedSecretGuard>,
    request: Request,
    next: Next,
) -> Response {
    if !guard.verify(request.headers()) {
        get_metrics().await.tokens_rejected.with_label_values(&["unauthorized"]).inc();
        warn!(path = %request.uri().path(), "shared secret missing or mismatched");
        return RelayError::Unauthorized.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn accepts_exact_secret_only() {
        let guard = SharedSecretGuard::new("x-shared-secret", "s3cr3t").unwrap();

        assert!(guard.verify(&headers("x-shared-secret", "s3cr3t")));
        assert!(!guard.verify(&headers("x-shared-secret", "s3cr3")));
        assert!(!guard.verify(&headers("x-shared-secret", "s3cr3t!")));
        assert!(!guard.verify(&headers("x-shared-secret", "")));
        assert!(!guard.verify(&headers("x-other", "s3cr3t")));
        assert!(!guard.verify(&HeaderMap::new()));
    }

    #[test]
    fn header_name_is_case_insensitive() {
        let guard = SharedSecretGuard::new("X-Revei-Secret", "abc").unwrap();
        assert_eq!(guard.header().as_str(), "x-revei-secret");
        assert!(guard.verify(&headers("x-revei-secret", "abc")));
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(SharedSecretGuard::new("bad header", "abc").is_err());
        assert!(SharedSecretGuard::new("x-shared-secret", "").is_err());
    }
}
