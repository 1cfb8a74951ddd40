use std::time::Duration;

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::token_store::TokenStore;
use crate::observability::metrics::get_metrics;

/// Purge expired tokens once. Runs inside every issuance.
pub async fn sweep_once(store: &TokenStore) -> usize {
    let removed = store.sweep_expired().await;
    if removed > 0 {
        get_metrics().await.tokens_swept.inc_by(removed as u64);
        debug!("swept {} expired tokens", removed);
    }
    removed
}

/// Background sweep independent of issuance traffic.
/// A zero interval disables it and returns immediately.
pub async fn loop_sweep_expired(store: TokenStore, interval: Duration) -> Result<()> {
    if interval.is_zero() {
        info!("periodic token sweep disabled");
        return Ok(());
    }

    info!("periodic token sweep every {} seconds", interval.as_secs());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        sweep_once(&store).await;
    }
}
