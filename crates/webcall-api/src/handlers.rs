//! HTTP API handlers under `/rtcsig`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;

use webcall_core::config::ServerConfig;
use webcall_core::CallerInfo;
use webcall_services::{notify_missed_calls, AccountError, SignalCore};

use crate::request::{remote_addr, RequestContext};

/// Largest `/message` body that gets logged.
const MAX_MESSAGE_BYTES: usize = 4096;

#[derive(Clone)]
pub struct ApiState {
    pub core: SignalCore,
    pub maintenance_mode: bool,
    /// Besides loopback, addresses allowed to call the dump endpoints.
    pub admin_addrs: Arc<Vec<String>>,
    pub trusted_proxies: Arc<Vec<String>>,
}

impl ApiState {
    pub fn new(core: SignalCore, server: &ServerConfig) -> Self {
        Self {
            core,
            maintenance_mode: server.maintenance_mode,
            admin_addrs: Arc::new(server.admin_addrs.clone()),
            trusted_proxies: Arc::new(server.trusted_proxies.clone()),
        }
    }

    pub fn context(
        &self,
        peer: SocketAddr,
        headers: &HeaderMap,
        query: &HashMap<String, String>,
    ) -> RequestContext {
        RequestContext::new(&self.core.resolver, peer, headers, query)
    }

    fn is_admin(&self, remote_addr: &str) -> bool {
        remote_addr == "127.0.0.1" || self.admin_addrs.iter().any(|a| a == remote_addr)
    }

    /// Client address for admin checks. `X-Real-IP` counts only when the
    /// socket peer is a trusted proxy; anyone else could forge loopback.
    fn admin_addr(&self, peer: SocketAddr, headers: &HeaderMap) -> String {
        let socket = peer.to_string();
        let (peer_ip, _) = remote_addr(&socket, None);
        let real_ip = if self.trusted_proxies.iter().any(|p| *p == peer_ip) {
            headers.get("x-real-ip").and_then(|v| v.to_str().ok())
        } else {
            None
        };
        remote_addr(&socket, real_ip).0
    }
}

// ── /mode ────────────────────────────────────────────────────────────────────

pub async fn handle_mode(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> &'static str {
    let ctx = state.context(peer, &headers, &query);
    let s = &ctx.session;
    if state.maintenance_mode {
        tracing::info!(rip = %ctx.remote_addr, "mode maintenance");
        return "maintenance";
    }
    if s.is_owner() {
        tracing::debug!(callee = %s.callee_id, url_id = %s.url_id, rip = %ctx.remote_addr, "mode normal|ok");
        return "normal|ok";
    }
    tracing::debug!(callee = %s.callee_id, url_id = %s.url_id, rip = %ctx.remote_addr, "mode normal");
    "normal"
}

// ── /logout ──────────────────────────────────────────────────────────────────

pub async fn handle_logout(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let ctx = state.context(peer, &headers, &query);
    let out = state
        .core
        .resolver
        .logout(ctx.cookie_header.as_deref(), &ctx.session.url_id);
    let body = if out.deleted { "ok" } else { "" };
    ([(header::SET_COOKIE, out.clear_cookie)], body).into_response()
}

// ── /login, /register, /avail ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub pw: String,
}

fn with_cookie(set_cookie: Option<String>, body: &'static str) -> Response {
    match set_cookie {
        Some(c) => ([(header::SET_COOKIE, c)], body).into_response(),
        None => body.into_response(),
    }
}

fn account_failure(callee: &str, err: AccountError) -> Response {
    match err {
        AccountError::NotRegistered(_) => "notregistered".into_response(),
        AccountError::WrongPassword(_) => "wrongpw".into_response(),
        AccountError::Taken(_) => "notavail".into_response(),
        AccountError::InvalidId(_) | AccountError::WeakPassword => {
            (StatusCode::BAD_REQUEST, "error").into_response()
        }
        AccountError::Store(e) => {
            tracing::error!(callee, error = %e, "credential store failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "error").into_response()
        }
    }
}

pub async fn handle_login(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<PasswordForm>,
) -> Response {
    let ctx = state.context(peer, &headers, &query);
    let callee = ctx.session.url_id.clone();
    if callee.is_empty() {
        return (StatusCode::BAD_REQUEST, "error").into_response();
    }
    if state.maintenance_mode {
        return "maintenance".into_response();
    }
    if ctx.session.is_owner() {
        state.core.hubs.get_or_create(&callee);
        tracing::debug!(callee = %callee, rip = %ctx.remote_addr, "login with live session");
        return "ok".into_response();
    }

    let accounts = &state.core.accounts;
    let issued = if ctx.nocookie {
        accounts.verify(&callee, &form.pw).map(|_| None)
    } else {
        accounts
            .login(&state.core.resolver, &callee, &form.pw)
            .map(Some)
    };
    match issued {
        Ok(set_cookie) => {
            state.core.hubs.get_or_create(&callee);
            tracing::info!(callee = %callee, rip = %ctx.remote_addr, ua = %ctx.user_agent, "login");
            with_cookie(set_cookie, "ok")
        }
        Err(e) => {
            tracing::info!(callee = %callee, rip = %ctx.remote_addr, error = %e, "login refused");
            account_failure(&callee, e)
        }
    }
}

pub async fn handle_register(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<PasswordForm>,
) -> Response {
    let ctx = state.context(peer, &headers, &query);
    let callee = id.to_lowercase();
    if state.maintenance_mode {
        return "maintenance".into_response();
    }
    let hashed = match state.core.accounts.register(&callee, &form.pw) {
        Ok(h) => h,
        Err(e) => {
            tracing::info!(callee = %callee, rip = %ctx.remote_addr, error = %e, "register refused");
            return account_failure(&callee, e);
        }
    };
    state.core.hubs.get_or_create(&callee);
    tracing::info!(callee = %callee, rip = %ctx.remote_addr, "register");
    if ctx.nocookie {
        return "ok".into_response();
    }
    match state.core.resolver.issue(&callee, &hashed) {
        Ok(set_cookie) => with_cookie(Some(set_cookie), "ok"),
        Err(e) => account_failure(&callee, e.into()),
    }
}

pub async fn handle_avail(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Response {
    let callee = id.to_lowercase();
    let accounts = &state.core.accounts;
    if !accounts.is_valid_id(&callee) {
        return "notavail".into_response();
    }
    match accounts.exists(&callee) {
        Ok(false) => "avail".into_response(),
        Ok(true) => "notavail".into_response(),
        Err(e) => account_failure(&callee, e.into()),
    }
}

// ── /version ─────────────────────────────────────────────────────────────────

pub async fn handle_version() -> String {
    format!(
        "version {}\nbuilddate {}\n",
        env!("CARGO_PKG_VERSION"),
        option_env!("WEBCALL_BUILDDATE").unwrap_or("unknown")
    )
}

// ── /message ─────────────────────────────────────────────────────────────────

pub async fn handle_message(ConnectInfo(peer): ConnectInfo<SocketAddr>, body: Bytes) {
    let text = String::from_utf8_lossy(&body[..body.len().min(MAX_MESSAGE_BYTES)]);
    if text.is_empty() || text.contains("images/branding/product") {
        return;
    }
    tracing::info!(peer = %peer, message = %text, "client message");
}

// ── /online ──────────────────────────────────────────────────────────────────

pub async fn handle_online(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> &'static str {
    let ctx = state.context(peer, &headers, &query);
    let status = match state.core.hubs.lookup(&ctx.session.url_id) {
        Some(hub) if hub.is_online() && !hub.connected_caller_ip().is_empty() => "busy",
        Some(hub) if hub.is_online() => "online",
        _ => "offline",
    };
    tracing::debug!(url_id = %ctx.session.url_id, rip = %ctx.remote_addr, status, "online check");
    status
}

// ── /notifyCallee, /missedCall ───────────────────────────────────────────────

fn stamp(mut caller: CallerInfo, ctx: &RequestContext) -> CallerInfo {
    if caller.addr_port.is_empty() {
        caller.addr_port = ctx.remote_addr_with_port.clone();
    }
    if caller.call_time == 0 {
        caller.call_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
    }
    caller
}

pub async fn handle_notify_callee(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(caller): Json<CallerInfo>,
) -> Result<&'static str, (StatusCode, String)> {
    let ctx = state.context(peer, &headers, &query);
    let callee = ctx.session.url_id.clone();
    if callee.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "missing id".into()));
    }
    state.core.backlog.add_waiting(&callee, stamp(caller, &ctx));
    if let Some(hub) = state.core.hubs.lookup(&callee) {
        if let Err(e) = state.core.deliver_waiting(&hub) {
            tracing::info!(callee = %callee, error = %e, "waiting caller queued");
        }
    }
    Ok("ok")
}

pub async fn handle_missed_call(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(caller): Json<CallerInfo>,
) -> Result<&'static str, (StatusCode, String)> {
    let ctx = state.context(peer, &headers, &query);
    let callee = ctx.session.url_id.clone();
    if callee.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "missing id".into()));
    }
    let missed = state.core.backlog.add_missed(&callee, stamp(caller, &ctx));
    if let Some(hub) = state.core.hubs.lookup(&callee) {
        if let Err(e) = notify_missed_calls(&hub, &missed) {
            tracing::info!(callee = %callee, error = %e, "missed call queued");
        }
    }
    Ok("ok")
}

// ── /dumponline, /hubinfo ────────────────────────────────────────────────────

fn admin_guard(
    state: &ApiState,
    peer: SocketAddr,
    headers: &HeaderMap,
    path: &str,
) -> Result<(), StatusCode> {
    let rip = state.admin_addr(peer, headers);
    if !state.is_admin(&rip) {
        tracing::warn!(path, rip = %rip, "admin request denied");
        return Err(StatusCode::FORBIDDEN);
    }
    tracing::info!(path, rip = %rip, "admin request");
    Ok(())
}

pub async fn handle_dump_online(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<String, StatusCode> {
    admin_guard(&state, peer, &headers, "/dumponline")?;
    let mut out = String::new();
    state.core.hubs.for_each(|callee_id, hub| {
        let snap = hub.snapshot();
        let conn = snap.client_id.map(|id| id.get()).unwrap_or(0);
        let _ = writeln!(
            out,
            "online {:<20} ip={:<20} wsCli={} callerIp={:<20} ua={}",
            callee_id, snap.client_addr, conn, snap.connected_caller_ip, snap.user_agent
        );
    });
    out.push('\n');
    Ok(out)
}

pub async fn handle_hub_info(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<String, StatusCode> {
    admin_guard(&state, peer, &headers, "/hubinfo")?;
    let mut lines: Vec<String> = Vec::new();
    state.core.hubs.for_each(|callee_id, hub| {
        let caller_ip = hub.connected_caller_ip();
        if caller_ip.is_empty() {
            lines.push(format!("{callee_id} idle"));
        } else {
            lines.push(format!("{callee_id} caller: {caller_ip}"));
        }
    });
    lines.sort();
    let mut out = String::new();
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

// ── fallback ─────────────────────────────────────────────────────────────────

pub async fn handle_unknown(ConnectInfo(peer): ConnectInfo<SocketAddr>, uri: Uri) -> StatusCode {
    tracing::warn!(path = %uri.path(), peer = %peer, "unhandled api call");
    StatusCode::NOT_FOUND
}
