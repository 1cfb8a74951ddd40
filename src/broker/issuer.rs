use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::broker::sweep::sweep_once;
use crate::cache::{token::RelayToken, token_store::TokenStore};
use crate::error::{RelayError, Result};
use crate::helpers::time::expires_after;
use crate::observability::metrics::get_metrics;
use crate::utils::logging::token_prefix;

const MAX_MINT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in_sec: u64,
}

/// Mints single-use relay tokens bound to an interview session id.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    store: TokenStore,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(store: TokenStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Mint a token for `session_id`, store it with the configured TTL and
    /// purge expired entries.
    pub async fn issue(&self, session_id: &str) -> Result<IssuedToken> {
        let metrics = get_metrics().await;
        let session_id = session_id.trim();
        if session_id.is_empty() {
            metrics.tokens_rejected.with_label_values(&["invalid_argument"]).inc();
            return Err(RelayError::InvalidArgument("sessionId must not be empty".to_string()));
        }

        let entry = RelayToken::new(session_id.to_owned(), expires_after(self.ttl));
        let mut minted = None;
        for _ in 0..MAX_MINT_ATTEMPTS {
            let candidate = mint_token();
            if self.store.insert(candidate.clone(), entry.clone()).await {
                minted = Some(candidate);
                break;
            }
            warn!("token collision, minting again");
        }
        let token = minted.ok_or_else(|| RelayError::Config("unable to mint a unique token".to_string()))?;

        sweep_once(&self.store).await;

        metrics.tokens_issued.inc();
        info!(
            session_id = %session_id,
            token = %token_prefix(&token),
            ttl_secs = self.ttl.as_secs(),
            "relay token issued"
        );

        Ok(IssuedToken { token, expires_in_sec: self.ttl.as_secs() })
    }
}

/// Random opaque token; 122 bits of randomness from a v4 uuid.
fn mint_token() -> String {
    Uuid::new_v4().simple().to_string()
}
