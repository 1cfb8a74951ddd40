use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::broker::issuer::TokenIssuer;
use crate::broker::routes::issue_token;
use crate::cache::token_store::TokenStore;
use crate::config::settings::MetricsConfig;
use crate::config::types::ServiceConfig;
use crate::observability::metrics::get_metrics;
use crate::observability::routes::{health_check, MetricsState};
use crate::recording::client::RecordingClient;
use crate::recording::routes as recording_routes;
use crate::relay::routes::relay_upgrade;
use crate::relay::session::RelayContext;
use crate::relay::upstream::UpstreamConnector;
use crate::server::guard::{require_shared_secret, SharedSecretGuard};

/// Process-lifetime context handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: TokenStore,
    pub issuer: TokenIssuer,
    pub relay: RelayContext,
    pub recording: Option<RecordingClient>,
    pub guard: SharedSecretGuard,
    pub metrics_state: MetricsState,
}

impl AppState {
    /// Resolve secrets and build every component from configuration.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let metrics = get_metrics().await;

        let secret = config.auth.secret.resolve().context("auth.secret")?;
        let guard = SharedSecretGuard::new(&config.auth.header, &secret)?;

        let credential = config
            .transcription
            .credential
            .resolve()
            .context("transcription.credential")?;
        let upstream = UpstreamConnector::new(
            &config.transcription.url,
            &config.transcription.auth_scheme,
            &credential,
            Duration::from_millis(config.transcription.connect_timeout_ms),
        );

        let recording = match &config.recording {
            Some(recording) => {
                let api_key = recording.api_key.resolve().context("recording.api_key")?;
                Some(RecordingClient::new(
                    &recording.base_url,
                    &api_key,
                    Duration::from_millis(recording.timeout_ms),
                    &recording.room_privacy,
                )?)
            }
            None => None,
        };

        let store = TokenStore::with_size_gauge(metrics.token_store_size.clone());
        let issuer = TokenIssuer::new(store.clone(), Duration::from_secs(config.tokens.ttl_seconds));

        Ok(Self {
            relay: RelayContext::new(store.clone(), upstream),
            issuer,
            store,
            recording,
            guard,
            metrics_state: MetricsState::new(metrics.registry.clone()),
        })
    }
}

/// Guarded server-to-server routes, the open relay upgrade, health and metrics.
pub fn router(state: AppState, metrics_config: &MetricsConfig) -> Router {
    let mut guarded: Router<AppState> = Router::new().route("/stt/token", post(issue_token));
    if state.recording.is_some() {
        guarded = guarded.merge(recording_routes::router());
    }
    let guarded = guarded.route_layer(middleware::from_fn_with_state(
        state.guard.clone(),
        require_shared_secret,
    ));

    Router::new()
        .merge(guarded)
        .route("/stt/relay", get(relay_upgrade))
        .route("/health", get(health_check))
        .merge(state.metrics_state.router(metrics_config))
        .with_state(state)
}

/// Bind the listener and serve until ctrl-c.
pub async fn start(config: &ServiceConfig, state: AppState) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(state, &config.settings.metrics);

    let bind_addr = config.settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("bind {}", bind_addr))?;
    info!("listening on {}", bind_addr);
    metrics.up.set(1);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    metrics.up.set(0);
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
