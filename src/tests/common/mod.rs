// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::proc_loader::parse_config;
use crate::config::types::ServiceConfig;
use crate::server::server::{self, AppState};

pub const TEST_SECRET: &str = "test-shared-secret";
pub const TEST_STT_KEY: &str = "test-stt-key";
pub const TEST_RECORDING_KEY: &str = "test-recording-key";

pub type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Service config pointing at local mocks.
pub async fn test_config(upstream_url: &str, recording_base_url: Option<&str>) -> ServiceConfig {
    let recording = recording_base_url
        .map(|base_url| {
            format!(
                r#"
recording:
  base_url: "{}"
  api_key: {{ value: "{}" }}
  timeout_ms: 2000
"#,
                base_url, TEST_RECORDING_KEY
            )
        })
        .unwrap_or_default();

    let yaml = format!(
        r#"
settings:
  server:
    host: 127.0.0.1
    port: "8080"
  metrics:
    is_enabled: true
    path: /metrics
  logging:
    level: debug
    format: compact
auth:
  header: x-shared-secret
  secret: {{ value: "{}" }}
tokens:
  ttl_seconds: 600
  sweep_interval_seconds: 0
transcription:
  url: "{}"
  auth_scheme: Token
  credential: {{ value: "{}" }}
  connect_timeout_ms: 1000
{}"#,
        TEST_SECRET, upstream_url, TEST_STT_KEY, recording
    );
    parse_config(yaml).await.expect("test config must be valid")
}

/// The relay service running on an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl TestApp {
    pub async fn spawn(config: &ServiceConfig) -> Self {
        let state = AppState::from_config(config).await.expect("app state");
        Self::spawn_with_state(config, state).await
    }

    pub async fn spawn_with_state(config: &ServiceConfig, state: AppState) -> Self {
        let router = server::router(state.clone(), &config.settings.metrics);
        let (handle, addr) = spawn_axum(router).await;
        Self { addr, state, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn issue_token(&self, session_id: &str) -> String {
        let res = build_reqwest_client()
            .post(self.url("/stt/token"))
            .header("x-shared-secret", TEST_SECRET)
            .json(&json!({ "sessionId": session_id }))
            .send()
            .await
            .expect("token request");
        assert!(res.status().is_success(), "unexpected status: {}", res.status());
        let body: Value = res.json().await.expect("token json");
        body["token"].as_str().expect("token field").to_string()
    }

    pub async fn open_relay(&self, token: Option<&str>) -> ClientSocket {
        let url = match token {
            Some(token) => format!("ws://{}/stt/relay?token={}", self.addr, token),
            None => format!("ws://{}/stt/relay", self.addr),
        };
        let (socket, _) = connect_async(url).await.expect("relay upgrade");
        socket
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Next text frame from the relay as JSON, skipping control frames.
/// `None` once the relay closed the connection.
pub async fn next_json(socket: &mut ClientSocket) -> Option<Value> {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for relay frame");
        match next {
            Some(Ok(Message::Text(text))) => {
                return Some(serde_json::from_str(text.as_str()).expect("relay frames are JSON"))
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

/// Wait until the relay closes the client connection.
pub async fn expect_closed(socket: &mut ClientSocket) {
    assert_eq!(next_json(socket).await, None, "expected the relay to close the connection");
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    Connected { authorization: Option<String> },
    Frame(Message),
    Closed,
}

#[derive(Debug)]
pub enum UpstreamCommand {
    Send(Message),
    Close,
}

/// Local stand-in for the speech-to-text provider.
/// Serves one connection at a time and reports everything it sees.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub connections: Arc<AtomicUsize>,
    pub events: mpsc::UnboundedReceiver<UpstreamEvent>,
    pub commands: mpsc::UnboundedSender<UpstreamCommand>,
    handle: JoinHandle<()>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock upstream");
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let (events_tx, events) = mpsc::unbounded_channel();
        let (commands, mut commands_rx) = mpsc::unbounded_channel::<UpstreamCommand>();

        let counter = connections.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);

                let mut authorization = None;
                let callback = |req: &Request, res: Response| -> Result<Response, ErrorResponse> {
                    authorization = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    Ok(res)
                };
                let mut ws = match accept_hdr_async(stream, callback).await {
                    Ok(ws) => ws,
                    Err(_) => continue,
                };
                let _ = events_tx.send(UpstreamEvent::Connected { authorization });

                loop {
                    tokio::select! {
                        incoming = ws.next() => match incoming {
                            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                                let _ = events_tx.send(UpstreamEvent::Closed);
                                break;
                            }
                            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                            Some(Ok(message)) => {
                                let _ = events_tx.send(UpstreamEvent::Frame(message));
                            }
                        },
                        command = commands_rx.recv() => match command {
                            Some(UpstreamCommand::Send(message)) => {
                                let _ = ws.send(message).await;
                            }
                            Some(UpstreamCommand::Close) | None => {
                                let _ = ws.close(None).await;
                                let _ = events_tx.send(UpstreamEvent::Closed);
                                break;
                            }
                        },
                    }
                }
            }
        });

        Self { addr, connections, events, commands, handle }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/v1/listen", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub async fn next_event(&mut self) -> UpstreamEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for upstream event")
            .expect("mock upstream stopped")
    }

    pub fn send_text(&self, text: &str) {
        self.commands
            .send(UpstreamCommand::Send(Message::Text(text.to_owned().into())))
            .expect("mock upstream stopped");
    }

    pub fn close(&self) {
        self.commands.send(UpstreamCommand::Close).expect("mock upstream stopped");
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
