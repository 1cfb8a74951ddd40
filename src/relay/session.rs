//! One relay session: browser WebSocket <-> provider WebSocket.
//!
//! States: `AwaitingToken -> UpstreamConnecting -> Bridging -> Closed`.
//! A single task multiplexes both sockets, so when either side ends the other
//! is closed before the task returns.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tracing::{debug, info, warn};

use crate::cache::token_store::TokenStore;
use crate::error::RelayError;
use crate::observability::metrics::{get_metrics, Metrics, DOWNSTREAM_TO_UPSTREAM, UPSTREAM_TO_DOWNSTREAM};
use crate::relay::frame::{RelayErrorCode, RelayFrame};
use crate::relay::upstream::{UpstreamConnector, UpstreamSocket};
use crate::utils::logging::token_prefix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    AwaitingToken,
    UpstreamConnecting,
    Bridging,
    Closed,
}

/// Why a bridging session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    DownstreamClosed,
    UpstreamClosed,
    DownstreamError(String),
    UpstreamError(String),
}

/// Everything a relay session needs, shared by all sessions.
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub store: TokenStore,
    pub upstream: UpstreamConnector,
}

impl RelayContext {
    pub fn new(store: TokenStore, upstream: UpstreamConnector) -> Self {
        Self { store, upstream }
    }
}

struct RelaySession {
    state: RelayState,
    session_id: Option<String>,
}

impl RelaySession {
    fn new() -> Self {
        Self { state: RelayState::AwaitingToken, session_id: None }
    }

    fn transition(&mut self, next: RelayState) {
        debug!(
            session_id = self.session_id.as_deref().unwrap_or("-"),
            "relay {:?} -> {:?}", self.state, next
        );
        self.state = next;
    }
}

/// Drive one relay connection from token check to teardown.
pub async fn run_relay(mut downstream: WebSocket, token: Option<String>, ctx: RelayContext) {
    let metrics = get_metrics().await;
    let mut session = RelaySession::new();

    let token = token
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty());
    let entry = match &token {
        Some(value) => ctx.store.consume(value).await,
        None => None,
    };

    let Some(entry) = entry else {
        let err = RelayError::TokenInvalid;
        metrics.tokens_rejected.with_label_values(&[err.code()]).inc();
        warn!(
            token = token.as_deref().map(token_prefix).unwrap_or("-"),
            "relay rejected: {}", err
        );
        send_frame(&mut downstream, &RelayFrame::error(RelayErrorCode::from(&err))).await;
        close_downstream(&mut downstream).await;
        session.transition(RelayState::Closed);
        return;
    };

    metrics.tokens_consumed.inc();
    session.session_id = Some(entry.session_id);
    session.transition(RelayState::UpstreamConnecting);

    let mut upstream = match ctx.upstream.connect().await {
        Ok(socket) => socket,
        Err(err) => {
            metrics.upstream_failures.with_label_values(&["relay_connect"]).inc();
            warn!(
                session_id = session.session_id.as_deref().unwrap_or("-"),
                "upstream connect failed: {}", err
            );
            send_frame(&mut downstream, &RelayFrame::error(RelayErrorCode::from(&err))).await;
            close_downstream(&mut downstream).await;
            session.transition(RelayState::Closed);
            return;
        }
    };

    session.transition(RelayState::Bridging);
    metrics.relay_sessions_active.inc();

    let termination = if send_frame(&mut downstream, &RelayFrame::Ready).await {
        bridge(&mut downstream, &mut upstream, metrics).await
    } else {
        Termination::DownstreamError("ready frame not delivered".to_string())
    };

    // tear down both sides; either may already be gone
    let _ = upstream.close(None).await;
    close_downstream(&mut downstream).await;

    metrics.relay_sessions_active.dec();
    info!(
        session_id = session.session_id.as_deref().unwrap_or("-"),
        "relay session ended: {:?}", termination
    );
    session.transition(RelayState::Closed);
}

/// Forward frames both ways until either side ends.
///
/// Downstream binary (and text) frames go upstream verbatim, in order.
/// Upstream frames are wrapped as `{"type":"data","payload":...}`; frames
/// that are not JSON are dropped.
async fn bridge(downstream: &mut WebSocket, upstream: &mut UpstreamSocket, metrics: &Metrics) -> Termination {
    loop {
        tokio::select! {
            incoming = downstream.recv() => match incoming {
                Some(Ok(Message::Binary(data))) => {
                    if let Err(err) = upstream.send(UpstreamMessage::Binary(data)).await {
                        return Termination::UpstreamError(err.to_string());
                    }
                    metrics.relay_frames.with_label_values(&[DOWNSTREAM_TO_UPSTREAM]).inc();
                }
                Some(Ok(Message::Text(text))) => {
                    if let Err(err) = upstream.send(UpstreamMessage::Text(text.as_str().to_owned().into())).await {
                        return Termination::UpstreamError(err.to_string());
                    }
                    metrics.relay_frames.with_label_values(&[DOWNSTREAM_TO_UPSTREAM]).inc();
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Termination::DownstreamClosed,
                Some(Err(err)) => return Termination::DownstreamError(err.to_string()),
            },
            incoming = upstream.next() => match incoming {
                Some(Ok(UpstreamMessage::Text(text))) => {
                    if !forward_upstream(downstream, text.as_str().as_bytes(), metrics).await {
                        return Termination::DownstreamError("send failed".to_string());
                    }
                }
                Some(Ok(UpstreamMessage::Binary(data))) => {
                    if !forward_upstream(downstream, &data, metrics).await {
                        return Termination::DownstreamError("send failed".to_string());
                    }
                }
                Some(Ok(UpstreamMessage::Close(_))) | None => return Termination::UpstreamClosed,
                Some(Ok(_)) => {}
                Some(Err(err)) => return Termination::UpstreamError(err.to_string()),
            },
        }
    }
}

/// Returns false only when the downstream socket is gone.
async fn forward_upstream(downstream: &mut WebSocket, raw: &[u8], metrics: &Metrics) -> bool {
    match RelayFrame::from_upstream(raw) {
        Some(frame) => {
            let delivered = send_frame(downstream, &frame).await;
            if delivered {
                metrics.relay_frames.with_label_values(&[UPSTREAM_TO_DOWNSTREAM]).inc();
            }
            delivered
        }
        None => {
            metrics.relay_frames_dropped.inc();
            debug!("dropped non-JSON upstream frame ({} bytes)", raw.len());
            true
        }
    }
}

async fn send_frame(downstream: &mut WebSocket, frame: &RelayFrame) -> bool {
    let json = match frame.to_json() {
        Ok(json) => json,
        Err(err) => {
            warn!("failed to serialize relay frame: {}", err);
            return false;
        }
    };
    downstream.send(Message::Text(json.into())).await.is_ok()
}

async fn close_downstream(downstream: &mut WebSocket) {
    let _ = downstream.send(Message::Close(None)).await;
}
