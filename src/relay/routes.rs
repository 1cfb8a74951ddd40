use axum::{
    extract::{rejection::QueryRejection, ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::debug;

use crate::relay::session::run_relay;
use crate::server::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RelayParams {
    pub token: Option<String>,
}

/// GET /stt/relay?token=...
///
/// No shared secret here: the token is the capability. Missing, unknown and
/// expired tokens still get the upgrade so the client receives an error frame.
/// An unparseable query counts as a missing token.
pub async fn relay_upgrade(
    ws: WebSocketUpgrade,
    params: Result<Query<RelayParams>, QueryRejection>,
    State(state): State<AppState>,
) -> Response {
    let token = match params {
        Ok(Query(params)) => params.token,
        Err(rejection) => {
            debug!("relay query rejected: {}", rejection.body_text());
            None
        }
    };
    let ctx = state.relay.clone();
    ws.on_upgrade(move |socket| run_relay(socket, token, ctx))
}
