use std::fmt;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{RelayError, Result};

pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens authenticated WebSocket connections to the speech-to-text provider.
#[derive(Clone)]
pub struct UpstreamConnector {
    url: String,
    authorization: String,
    connect_timeout: Duration,
}

impl UpstreamConnector {
    pub fn new(url: &str, auth_scheme: &str, credential: &str, connect_timeout: Duration) -> Self {
        Self {
            url: url.to_owned(),
            authorization: format!("{} {}", auth_scheme, credential),
            connect_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect and complete the handshake within the connect timeout.
    pub async fn connect(&self) -> Result<UpstreamSocket> {
        let mut request = self.url.as_str().into_client_request()?;
        let value = HeaderValue::from_str(&self.authorization)
            .map_err(|err| RelayError::Config(format!("invalid provider credential: {}", err)))?;
        request.headers_mut().insert(AUTHORIZATION, value);

        match tokio::time::timeout(self.connect_timeout, connect_async(request)).await {
            Ok(Ok((socket, response))) => {
                debug!(url = %self.url, status = %response.status(), "upstream handshake complete");
                Ok(socket)
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(RelayError::UpstreamFailure(format!(
                "handshake timed out after {} ms",
                self.connect_timeout.as_millis()
            ))),
        }
    }
}

impl fmt::Debug for UpstreamConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConnector")
            .field("url", &self.url)
            .field("authorization", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn debug_redacts_credential() {
        let connector = UpstreamConnector::new("ws://localhost/listen", "Token", "sekret", Duration::from_secs(1));
        let printed = format!("{:?}", connector);
        assert!(!printed.contains("sekret"));
    }

    #[tokio::test]
    async fn hung_handshake_times_out() {
        // accepts TCP but never answers the upgrade
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let connector = UpstreamConnector::new(&format!("ws://{}", addr), "Token", "k", Duration::from_millis(200));
        match connector.connect().await {
            Err(RelayError::UpstreamFailure(reason)) => assert!(reason.contains("timed out")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("handshake should not complete"),
        }
        hold.abort();
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = UpstreamConnector::new(&format!("ws://{}", addr), "Token", "k", Duration::from_secs(1));
        assert!(matches!(connector.connect().await, Err(RelayError::UpstreamFailure(_))));
    }
}
