//! Per-request context: remote address, user agent and resolved session.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use webcall_services::{RequestIdentity, Session, SessionResolver};

/// User-agent fragments that mark crawlers.
const BOT_MARKERS: [&str; 5] = ["bot", "spider", "scan", "search", "acebook"];

#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Remote address without port.
    pub remote_addr: String,
    pub remote_addr_with_port: String,
    pub user_agent: String,
    pub cookie_header: Option<String>,
    /// `?nocookie` was present.
    pub nocookie: bool,
    pub session: Session,
}

impl RequestContext {
    pub fn new(
        resolver: &SessionResolver,
        peer: SocketAddr,
        headers: &HeaderMap,
        query: &HashMap<String, String>,
    ) -> Self {
        let (remote_addr, remote_addr_with_port) =
            remote_addr(&peer.to_string(), header_str(headers, "x-real-ip"));
        let cookie_header = header_str(headers, header::COOKIE.as_str()).map(str::to_string);
        let session = resolver.resolve(&RequestIdentity {
            cookie_header: cookie_header.as_deref(),
            query_id: query.get("id").map(String::as_str),
            referer: header_str(headers, header::REFERER.as_str()),
        });
        Self {
            remote_addr,
            remote_addr_with_port,
            user_agent: header_str(headers, header::USER_AGENT.as_str())
                .unwrap_or_default()
                .to_string(),
            cookie_header,
            nocookie: query.contains_key("nocookie"),
            session,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Normalize the socket address, honouring a proxy's `X-Real-IP`.
///
/// Returns `(addr, addr_with_port)`.
pub fn remote_addr(socket_addr: &str, real_ip: Option<&str>) -> (String, String) {
    let mut with_port = match socket_addr.strip_prefix("[::1]") {
        Some(rest) => format!("127.0.0.1{rest}"),
        None => socket_addr.to_string(),
    };
    if let Some(alt) = real_ip {
        if alt.len() >= 7 && !with_port.starts_with(alt) {
            with_port = alt.to_string();
        }
    }
    let addr = with_port
        .split_once(':')
        .map_or(with_port.as_str(), |(a, _)| a)
        .to_string();
    (addr, with_port)
}

pub fn is_bot(user_agent: &str) -> bool {
    user_agent.is_empty() || BOT_MARKERS.iter().any(|m| user_agent.contains(m))
}

/// Middleware: answer crawler requests with an empty body.
pub async fn deny_bots(request: Request, next: Next) -> Response {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if is_bot(user_agent) {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|c| c.0.to_string())
            .unwrap_or_default();
        tracing::info!(path = %request.uri().path(), user_agent, peer = %peer, "bot denied");
        return ().into_response();
    }
    next.run(request).await
}
