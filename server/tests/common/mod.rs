//! Shared helpers for integration tests: an in-process server on a random
//! port, token minting, and a raw WebSocket client.

#![allow(dead_code)]

use futures_util::StreamExt;
use presence_protocol::ServerEvent;
use presence_server::config::KeepaliveConfig;
use presence_server::state::AppState;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub base_url: String,
    pub state: AppState,
    _data_dir: tempfile::TempDir,
}

/// Start the server on a random port with default keepalive settings.
pub async fn start_test_server() -> TestServer {
    start_test_server_with(KeepaliveConfig::default()).await
}

pub async fn start_test_server_with(keepalive: KeepaliveConfig) -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = presence_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = presence_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = AppState::new(db, jwt_secret, keepalive);
    let app = presence_server::routes::build_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        addr,
        base_url: format!("http://{}", addr),
        state,
        _data_dir: tmp_dir,
    }
}

impl TestServer {
    pub fn token(&self, user_id: &str) -> String {
        self.token_with_role(user_id, "user")
    }

    pub fn token_with_role(&self, user_id: &str, role: &str) -> String {
        presence_server::auth::jwt::issue_access_token(
            &self.state.jwt_secret,
            user_id,
            role,
            presence_server::auth::jwt::ACCESS_TOKEN_TTL_SECS,
        )
        .expect("Failed to issue token")
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Open a WebSocket with `?token=` and return it without reading anything.
    pub async fn open(&self, token: &str) -> WsStream {
        let url = format!("{}?token={}", self.ws_url(), token);
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("Failed to connect to WebSocket");
        ws
    }

    /// Connect as `user_id` and consume the `connect_status` frame.
    pub async fn connect(&self, user_id: &str) -> WsStream {
        let mut ws = self.open(&self.token(user_id)).await;
        match next_event(&mut ws).await {
            ServerEvent::ConnectStatus(status) => {
                assert!(status.connected);
                assert_eq!(status.user_id, user_id);
            }
            other => panic!("Expected connect_status, got {:?}", other),
        }
        ws
    }

    /// Wait until the registry reflects `online` for `user_id`.
    pub async fn wait_online(&self, user_id: &str, online: bool) {
        for _ in 0..100 {
            if self.state.sessions.is_online(user_id) == online {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("{} never became online={}", user_id, online);
    }

    pub fn http(&self) -> reqwest::Client {
        reqwest::Client::new()
    }
}

/// Next server event, skipping keepalive frames. Panics on close or timeout.
pub async fn next_event(ws: &mut WsStream) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Expected a frame within timeout");
        match msg {
            Some(Ok(Message::Text(text))) => {
                return ServerEvent::from_json(text.as_str()).expect("Invalid server event")
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            other => panic!("Expected a text frame, got {:?}", other),
        }
    }
}

/// Read until the server closes; returns the close frame if one was sent.
pub async fn expect_close(ws: &mut WsStream) -> Option<CloseFrame> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Expected close within timeout");
        match msg {
            Some(Ok(Message::Close(frame))) => return frame,
            Some(Ok(Message::Text(_))) | Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                continue
            }
            other => panic!("Expected close frame, got {:?}", other),
        }
    }
}

/// Assert nothing but keepalive traffic arrives for `wait`.
pub async fn expect_silence(ws: &mut WsStream, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
            Ok(other) => panic!("Expected no frames, got {:?}", other),
        }
    }
}
