//! webcall integration test harness.
//!
//! Each test starts its own signaling server on an ephemeral loopback port
//! with an in-memory credential store, then talks to it over HTTP and
//! websockets:
//!
//!   cargo test --test integration

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

use webcall_api::ApiState;
use webcall_core::config::{ServerConfig, SessionConfig};
use webcall_services::{MemoryCredentialStore, SignalCore};

mod accounts;
mod admin;
mod callee_ws;
mod session;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) webcall-it";

pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    /// Shares registries and the credential store with the running server.
    pub core: SignalCore,
    pub http: reqwest::Client,
}

pub async fn start_server() -> TestServer {
    start_server_with(ServerConfig::default()).await
}

pub async fn start_server_with(server: ServerConfig) -> TestServer {
    let core = SignalCore::new(Arc::new(MemoryCredentialStore::new()), &SessionConfig::default());
    let state = ApiState::new(core.clone(), &server);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            webcall_api::router(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap();

    TestServer {
        base_url: format!("http://{addr}/rtcsig"),
        addr,
        core,
        http,
    }
}

impl TestServer {
    /// Store a credential record and return the `Cookie` header that
    /// presents it.
    pub fn login(&self, callee_id: &str, hashed_pw: &str) -> String {
        let set_cookie = self.core.resolver.issue(callee_id, hashed_pw).unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn get_text(&self, path: &str, cookie: Option<&str>) -> Result<String> {
        let mut req = self.http.get(format!("{}{path}", self.base_url));
        if let Some(c) = cookie {
            req = req.header("Cookie", c);
        }
        Ok(req.send().await?.text().await?)
    }

    /// POST a urlencoded `pw` form. Returns `(Set-Cookie pair, body)`.
    pub async fn post_password(&self, path: &str, pw: &str) -> Result<(Option<String>, String)> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!("pw={pw}"))
            .send()
            .await?;
        let cookie = resp
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        Ok((cookie, resp.text().await?))
    }

    /// Open the callee websocket, presenting `cookie` if given.
    pub async fn connect_ws(&self, cookie: Option<&str>) -> Result<WsStream> {
        let mut request = format!("ws://{}/rtcsig/ws", self.addr).into_client_request()?;
        let headers = request.headers_mut();
        headers.insert("User-Agent", HeaderValue::from_static(USER_AGENT));
        if let Some(c) = cookie {
            headers.insert("Cookie", HeaderValue::from_str(c)?);
        }
        let (ws, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    /// Poll `/online` until it reports `want` or the deadline passes.
    pub async fn wait_for_status(&self, callee_id: &str, want: &str) -> Result<bool> {
        for _ in 0..50 {
            if self.get_text(&format!("/online?id={callee_id}"), None).await? == want {
                return Ok(true);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(false)
    }
}
